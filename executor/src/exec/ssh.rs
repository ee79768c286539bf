use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{minutes, normalize_host, run_batch, split_target, RemoteExecutor, DEFAULT_SSH_PORT};
use crate::error::{GeoRepError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub user: String,
    pub private_key_file: Option<PathBuf>,
    /// Port appended to management hosts given without one
    pub port: u16,
    /// Prefix remote commands with `sudo -n` (for non-root users)
    pub sudo: bool,
    pub connect_timeout_secs: u64,
    pub strict_host_key_checking: bool,
    /// OpenSSH client binary
    pub ssh_binary: String,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: "root".to_string(),
            private_key_file: None,
            port: DEFAULT_SSH_PORT,
            sudo: false,
            connect_timeout_secs: 10,
            strict_host_key_checking: false,
            ssh_binary: "ssh".to_string(),
        }
    }
}

/// Runs commands on the management host through the OpenSSH client.
///
/// Each command is its own non-interactive session authenticated with the
/// configured key; the first non-zero exit aborts the batch.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    config: SshConfig,
}

impl SshExecutor {
    pub fn new(config: SshConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    /// The `host:port` this executor connects to for `host`
    pub fn target(&self, host: &str) -> Result<String> {
        normalize_host(host, self.config.port)
    }

    /// Arguments passed to the ssh binary to run `command` on `target`
    pub fn ssh_args(&self, target: &str, command: &str) -> Result<Vec<String>> {
        let (host, port) = split_target(target).ok_or_else(|| {
            GeoRepError::precondition(format!("invalid ssh target '{}'", target))
        })?;

        let mut args = vec![
            "-p".to_string(),
            port.to_string(),
            "-l".to_string(),
            self.config.user.clone(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.config.connect_timeout_secs),
            "-o".to_string(),
            format!(
                "StrictHostKeyChecking={}",
                if self.config.strict_host_key_checking { "yes" } else { "no" }
            ),
        ];
        if let Some(key) = &self.config.private_key_file {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        args.push(host.to_string());
        args.push("--".to_string());
        if self.config.sudo {
            args.push(format!("sudo -n {}", command));
        } else {
            args.push(command.to_string());
        }

        Ok(args)
    }

    pub(crate) async fn run(
        &self,
        host: &str,
        commands: &[String],
        timeout: Duration,
    ) -> Result<Vec<String>> {
        let target = self.target(host)?;
        debug!("Running {} command(s) over ssh on {}", commands.len(), target);

        let arg_sets = commands
            .iter()
            .map(|command| self.ssh_args(&target, command))
            .collect::<Result<Vec<_>>>()?;

        run_batch(&target, commands, timeout, |index, _| {
            let mut cmd = Command::new(&self.config.ssh_binary);
            cmd.args(&arg_sets[index]);
            cmd
        })
        .await
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn execute(
        &self,
        host: &str,
        commands: &[String],
        timeout_minutes: u64,
    ) -> Result<Vec<String>> {
        self.run(host, commands, minutes(timeout_minutes)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executor() -> SshExecutor {
        SshExecutor::new(SshConfig {
            user: "xuser".to_string(),
            private_key_file: Some(PathBuf::from("xkeyfile")),
            ..Default::default()
        })
    }

    #[test]
    fn test_target_appends_default_port() {
        let exec = executor();
        assert_eq!(exec.target("host").unwrap(), "host:22");
        assert_eq!(exec.target("host:2222").unwrap(), "host:2222");
        assert!(exec.target("host:").unwrap_err().is_precondition());

        let exec = SshExecutor::new(SshConfig {
            port: 2200,
            ..Default::default()
        });
        assert_eq!(exec.target("host").unwrap(), "host:2200");
    }

    #[test]
    fn test_ssh_args() {
        let exec = executor();
        let args = exec
            .ssh_args("host:22", "gluster --mode=script volume geo-replication status --xml")
            .unwrap();

        assert_eq!(&args[..4], &["-p", "22", "-l", "xuser"]);
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"StrictHostKeyChecking=no".to_string()));
        let key = args.iter().position(|a| a == "-i").unwrap();
        assert_eq!(args[key + 1], "xkeyfile");
        assert_eq!(
            &args[args.len() - 3..],
            &[
                "host",
                "--",
                "gluster --mode=script volume geo-replication status --xml"
            ]
        );
    }

    #[test]
    fn test_ssh_args_sudo() {
        let exec = SshExecutor::new(SshConfig {
            sudo: true,
            ..Default::default()
        });
        let args = exec.ssh_args("[fe80::1]:22", "true").unwrap();

        assert!(!args.contains(&"-i".to_string()));
        assert_eq!(args[args.len() - 3], "fe80::1");
        assert_eq!(args.last().unwrap(), "sudo -n true");
    }

    #[tokio::test]
    async fn test_missing_ssh_binary_is_transport_error() {
        let exec = SshExecutor::new(SshConfig {
            ssh_binary: "/nonexistent/ssh".to_string(),
            ..Default::default()
        });
        let err = exec
            .execute("host", &["true".to_string()], 1)
            .await
            .unwrap_err();

        match err {
            GeoRepError::Transport { host, .. } => assert_eq!(host, "host:22"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_target_fails_before_spawning() {
        let exec = SshExecutor::new(SshConfig {
            ssh_binary: "/nonexistent/ssh".to_string(),
            ..Default::default()
        });
        let err = exec
            .execute("host:ssh", &["true".to_string()], 1)
            .await
            .unwrap_err();

        // a spawn attempt would have surfaced as a transport error
        assert!(err.is_precondition(), "unexpected error: {:?}", err);
    }
}
