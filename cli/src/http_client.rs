use anyhow::{Context, Result};
use reqwest::header::LOCATION;
use reqwest::{redirect, Method, Response, StatusCode, Url};
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

pub const PENDING_HEADER: &str = "x-pending";

#[derive(Clone)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
    user_agent: String,
    retries: u32,
    poll_interval: Duration,
    wait_limit: Duration,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration, retries: u32) -> Result<Self> {
        let base_url = Url::parse(base_url).context("Invalid server URL")?;
        // 303 replies from the queue are handled in `wait`
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url,
            http,
            user_agent: format!("georepctl/{}", env!("CARGO_PKG_VERSION")),
            retries,
            poll_interval: Duration::from_millis(500),
            wait_limit: Duration::from_secs(15 * 60),
        })
    }

    pub fn with_polling(mut self, interval: Duration, wait_limit: Duration) -> Self {
        self.poll_interval = interval;
        self.wait_limit = wait_limit;
        self
    }

    pub fn build_url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).with_context(|| {
            format!(
                "Failed to join server={} with path={}",
                self.base_url, path
            )
        })
    }

    /// Send a request and print the JSON reply
    pub async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<()> {
        let resp = self.send(method, path, body).await?;
        let bytes = resp.bytes().await.unwrap_or_default().to_vec();
        print_bytes(&bytes)
    }

    /// Submit a queued operation, wait for it, then print the result it points to
    pub async fn send_async(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<()> {
        let resp = self.send(method.clone(), path, body).await?;
        if resp.status() != StatusCode::ACCEPTED {
            anyhow::bail!(
                "HTTP {} {}: expected 202 Accepted, got {}",
                method,
                path,
                resp.status().as_u16()
            );
        }
        let queue = location(&resp)?;
        debug!("Operation queued at {}", queue);

        let result = self.wait(&queue).await?;
        self.send_json(Method::GET, &result, None).await
    }

    /// Poll `queue` until the operation finishes; returns where its result lives
    pub async fn wait(&self, queue: &str) -> Result<String> {
        let started = Instant::now();
        loop {
            let resp = self.send(Method::GET, queue, None).await?;
            if resp.status() == StatusCode::SEE_OTHER {
                return location(&resp);
            }
            if resp.headers().get(PENDING_HEADER).is_none() {
                anyhow::bail!(
                    "GET {}: unexpected status {}",
                    queue,
                    resp.status().as_u16()
                );
            }
            if started.elapsed() >= self.wait_limit {
                anyhow::bail!(
                    "Operation at {} still pending after {:?}",
                    queue,
                    self.wait_limit
                );
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One request with retries; non-success statuses other than 303 are errors
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response> {
        let url = self.build_url(path)?;

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let req_id = Uuid::new_v4().to_string();
            let mut req = self.http.request(method.clone(), url.clone());
            req = req.header("user-agent", &self.user_agent);
            req = req.header("x-request-id", &req_id);

            if let Some(b) = &body {
                req = req.json(b);
            }

            debug!("HTTP {} {} (attempt {})", method, url, attempt);
            let resp = req.send().await.context("Request failed")?;
            let status = resp.status();

            if status.is_success() || status == StatusCode::SEE_OTHER {
                return Ok(resp);
            }

            if attempt <= self.retries && should_retry(&method, status) {
                tokio::time::sleep(Duration::from_millis(300)).await;
                continue;
            }

            let bytes = resp.bytes().await.unwrap_or_default();
            anyhow::bail!(
                "HTTP {} {} failed: status={} body={}",
                method,
                url,
                status.as_u16(),
                String::from_utf8_lossy(&bytes).trim()
            );
        }
    }
}

/// 500 carries an operation's failure and is final; other 5xx are transient
fn should_retry(method: &Method, status: StatusCode) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    if status.is_server_error() && status != StatusCode::INTERNAL_SERVER_ERROR {
        return *method == Method::GET;
    }
    false
}

fn location(resp: &Response) -> Result<String> {
    let value = resp
        .headers()
        .get(LOCATION)
        .context("Response has no Location header")?;
    let location = value.to_str().context("Location header is not text")?;
    Ok(location.to_string())
}

fn print_bytes(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        println!("{}", r#"{"success":true}"#);
        return Ok(());
    }
    if let Ok(v) = serde_json::from_slice::<serde_json::Value>(bytes) {
        println!("{}", serde_json::to_string_pretty(&v)?);
    } else {
        println!("{}", String::from_utf8_lossy(bytes));
    }
    Ok(())
}
