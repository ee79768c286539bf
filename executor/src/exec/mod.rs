//! Running command batches on a management host.
//!
//! Every strategy implements [`RemoteExecutor`]: commands run strictly in
//! order, the batch stops at the first failing command, and the whole batch
//! is bounded by the caller's timeout. Nothing is retried.

mod local;
mod mock;
mod ssh;

pub use local::LocalExecutor;
pub use mock::{MockCall, MockExecutor};
pub use ssh::{SshConfig, SshExecutor};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error};

use crate::error::{GeoRepError, Result};

pub const DEFAULT_SSH_PORT: u16 = 22;

#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Run `commands` in order on `host`, returning captured stdout per command
    async fn execute(
        &self,
        host: &str,
        commands: &[String],
        timeout_minutes: u64,
    ) -> Result<Vec<String>>;
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    #[default]
    Ssh,
    Local,
    Mock,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub kind: ExecutorKind,
    /// Run local commands through `sudo -n`
    pub sudo: bool,
    pub ssh: SshConfig,
}

/// Build the executor selected by `config`
pub fn from_config(config: &ExecutorConfig) -> Arc<dyn RemoteExecutor> {
    match config.kind {
        ExecutorKind::Ssh => Arc::new(SshExecutor::new(config.ssh.clone())),
        ExecutorKind::Local => Arc::new(LocalExecutor::new().with_sudo(config.sudo)),
        ExecutorKind::Mock => Arc::new(MockExecutor::with_empty_status()),
    }
}

// ============================================================================
// Host addressing
// ============================================================================

/// Append `port` to a bare hostname; targets that carry a port are kept.
///
/// Bare IPv6 addresses are bracketed so the result always splits cleanly.
/// A single colon must be followed by a valid port.
pub fn normalize_host(host: &str, port: u16) -> Result<String> {
    let invalid = || GeoRepError::precondition(format!("invalid host '{}'", host));

    if host.is_empty() {
        return Err(invalid());
    }
    if host.starts_with('[') {
        if has_port(host) {
            return Ok(host.to_string());
        }
        if host.len() > 2 && host.ends_with(']') {
            return Ok(format!("{}:{}", host, port));
        }
        return Err(invalid());
    }
    match host.matches(':').count() {
        0 => Ok(format!("{}:{}", host, port)),
        1 if has_port(host) => Ok(host.to_string()),
        1 => Err(invalid()),
        // more than one colon is an unbracketed IPv6 address
        _ => Ok(format!("[{}]:{}", host, port)),
    }
}

/// Split a target produced by [`normalize_host`] into host and port
pub fn split_target(target: &str) -> Option<(&str, u16)> {
    let (host, port) = target.rsplit_once(':')?;
    let port = port.parse().ok()?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    Some((host, port))
}

fn has_port(host: &str) -> bool {
    let port = if host.starts_with('[') {
        host.rsplit_once("]:").map(|(_, port)| port)
    } else {
        host.split_once(':').map(|(_, port)| port)
    };
    port.is_some_and(|port| !port.is_empty() && port.parse::<u16>().is_ok())
}

// ============================================================================
// Batch execution
// ============================================================================

/// Run each command built by `build` in sequence under a single deadline.
///
/// `build` receives the position of the command in `commands`.
///
/// Children are spawned with `kill_on_drop`, so a timed-out batch takes its
/// running process (and any SSH session it holds) down with it.
pub(crate) async fn run_batch<F>(
    target: &str,
    commands: &[String],
    timeout: Duration,
    mut build: F,
) -> Result<Vec<String>>
where
    F: FnMut(usize, &str) -> Command + Send,
{
    let batch = async {
        let mut outputs = Vec::with_capacity(commands.len());

        for (index, command) in commands.iter().enumerate() {
            debug!("Running on {}: {}", target, command);

            let mut child = build(index, command);
            child
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let output = child.output().await.map_err(|source| GeoRepError::Transport {
                host: target.to_string(),
                source,
            })?;

            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                error!(
                    "Command failed on {} after {} of {} command(s): {}: {}",
                    target,
                    outputs.len() + 1,
                    commands.len(),
                    command,
                    stderr
                );
                if !stdout.is_empty() {
                    debug!("Output of failed command: {}", stdout);
                }
                return Err(GeoRepError::CommandFailed {
                    host: target.to_string(),
                    command: command.clone(),
                    exit_code: output.status.code(),
                    stderr,
                });
            }

            outputs.push(stdout);
        }

        Ok(outputs)
    };

    match tokio::time::timeout(timeout, batch).await {
        Ok(result) => result,
        Err(_) => {
            error!("Commands on {} timed out after {:?}", target, timeout);
            Err(GeoRepError::Timeout {
                host: target.to_string(),
                after: timeout,
            })
        }
    }
}

pub(crate) fn minutes(timeout_minutes: u64) -> Duration {
    Duration::from_secs(timeout_minutes.saturating_mul(60))
}
