use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tracing::info;

use super::{normalize_host, RemoteExecutor, DEFAULT_SSH_PORT};
use crate::error::{GeoRepError, Result};

const EMPTY_STATUS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cliOutput><opRet>0</opRet><opErrno>0</opErrno><opErrstr/><geoRep/></cliOutput>"#;

/// One recorded `execute` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub target: String,
    pub commands: Vec<String>,
    pub timeout_minutes: u64,
}

enum Reply {
    Output(Vec<String>),
    Fail(String),
}

#[derive(Default)]
struct MockState {
    calls: Vec<MockCall>,
    replies: VecDeque<Reply>,
    /// (command substring, stdout) answered when no queued reply is left
    canned: Vec<(String, String)>,
}

/// Executor that records calls instead of running anything.
///
/// Queued replies are consumed one per call; after that each command gets
/// the first canned output whose pattern it contains, or empty output.
#[derive(Default)]
pub struct MockExecutor {
    state: Mutex<MockState>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every status query with an envelope holding no volumes
    pub fn with_empty_status() -> Self {
        let mock = Self::new();
        mock.respond_to("status --xml", EMPTY_STATUS);
        mock
    }

    pub fn push_output(&self, output: Vec<String>) {
        self.lock().replies.push_back(Reply::Output(output));
    }

    pub fn push_failure(&self, stderr: impl Into<String>) {
        self.lock().replies.push_back(Reply::Fail(stderr.into()));
    }

    pub fn respond_to(&self, pattern: impl Into<String>, output: impl Into<String>) {
        self.lock().canned.push((pattern.into(), output.into()));
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        // a panicking test thread must not hide the recorded calls
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RemoteExecutor for MockExecutor {
    async fn execute(
        &self,
        host: &str,
        commands: &[String],
        timeout_minutes: u64,
    ) -> Result<Vec<String>> {
        let target = normalize_host(host, DEFAULT_SSH_PORT)?;
        info!("MOCK: {} command(s) on {}", commands.len(), target);

        let mut state = self.lock();
        state.calls.push(MockCall {
            target: target.clone(),
            commands: commands.to_vec(),
            timeout_minutes,
        });

        match state.replies.pop_front() {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::Fail(stderr)) => Err(GeoRepError::CommandFailed {
                host: target,
                command: commands.first().cloned().unwrap_or_default(),
                exit_code: Some(1),
                stderr,
            }),
            None => Ok(commands
                .iter()
                .map(|cmd| {
                    state
                        .canned
                        .iter()
                        .find(|(pattern, _)| cmd.contains(pattern.as_str()))
                        .map(|(_, out)| out.clone())
                        .unwrap_or_default()
                })
                .collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls_and_replies_in_order() {
        let mock = MockExecutor::new();
        mock.push_output(vec!["first".to_string()]);
        mock.push_failure("boom");

        let cmds = vec!["a".to_string()];
        assert_eq!(mock.execute("host", &cmds, 10).await.unwrap(), vec!["first"]);
        assert!(mock.execute("other:2222", &cmds, 5).await.is_err());
        assert_eq!(
            mock.execute("host", &cmds, 10).await.unwrap(),
            vec![String::new()]
        );

        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].target, "host:22");
        assert_eq!(calls[1].target, "other:2222");
        assert_eq!(calls[1].timeout_minutes, 5);
    }

    #[tokio::test]
    async fn test_empty_status_canned() {
        let mock = MockExecutor::with_empty_status();
        let out = mock
            .execute(
                "host",
                &["gluster --mode=script volume geo-replication status --xml".to_string()],
                10,
            )
            .await
            .unwrap();

        assert!(out[0].contains("<geoRep/>"));
    }
}
