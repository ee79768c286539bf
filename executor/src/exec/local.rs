use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{minutes, normalize_host, run_batch, RemoteExecutor, DEFAULT_SSH_PORT};
use crate::error::Result;

/// Runs commands on this machine with `sh -c`.
///
/// For control planes colocated with a storage node; the host argument
/// only labels logs and errors.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    shell: String,
    sudo: bool,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
            sudo: false,
        }
    }

    pub fn with_sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub(crate) async fn run(
        &self,
        host: &str,
        commands: &[String],
        timeout: Duration,
    ) -> Result<Vec<String>> {
        let target = normalize_host(host, DEFAULT_SSH_PORT)?;
        debug!("Running {} command(s) locally for {}", commands.len(), target);

        run_batch(&target, commands, timeout, |_, command| self.command(command)).await
    }

    fn command(&self, command: &str) -> Command {
        let mut cmd = if self.sudo {
            let mut c = Command::new("sudo");
            c.arg("-n").arg(&self.shell);
            c
        } else {
            Command::new(&self.shell)
        };
        cmd.arg("-c").arg(command);
        cmd
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteExecutor for LocalExecutor {
    async fn execute(
        &self,
        host: &str,
        commands: &[String],
        timeout_minutes: u64,
    ) -> Result<Vec<String>> {
        self.run(host, commands, minutes(timeout_minutes)).await
    }
}
