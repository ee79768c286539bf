//! Command lines for `gluster volume geo-replication`.
//!
//! Builders are pure: they validate the request and return the command
//! strings, leaving execution to a [`crate::RemoteExecutor`]. Values are
//! interpolated as given, without shell quoting.

use tracing::warn;

use crate::error::{GeoRepError, Result};
use crate::types::{GeoReplicationAction, GeoReplicationRequest};

const GEOREP: &str = "gluster --mode=script volume geo-replication";

/// Options accepted by `create`
const CREATE_OPTIONS: [&str; 2] = ["push-pem", "no-verify"];

/// How a `config` option is validated and emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    /// Any value, passed through
    Text,
    /// `true` or `false`, passed through
    Bool,
    /// `true` or `false`; only `true` is sent, as `1`
    Flag,
    /// Must parse as an integer
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigOption {
    pub kind: ConfigKind,
    /// Name the CLI expects, when it differs from the request key
    pub cli_name: Option<&'static str>,
}

const fn option(kind: ConfigKind) -> ConfigOption {
    ConfigOption { kind, cli_name: None }
}

/// Look up a recognized `config` key
pub fn config_option(key: &str) -> Option<ConfigOption> {
    let opt = match key {
        "log-level" | "gluster-log-level" | "changelog-log-level" | "ssh-command"
        | "rsync-command" | "checkpoint" => option(ConfigKind::Text),
        "use-tarssh" | "use-meta-volume" => option(ConfigKind::Bool),
        "ignore-deletes" => option(ConfigKind::Flag),
        "timeout" | "sync-jobs" => option(ConfigKind::Integer),
        // the CLI spells this one with an underscore
        "ssh-port" => ConfigOption {
            kind: ConfigKind::Integer,
            cli_name: Some("ssh_port"),
        },
        _ => return None,
    };
    Some(opt)
}

/// Reject requests that lack a slave endpoint
pub fn ensure_slave(request: &GeoReplicationRequest) -> Result<()> {
    if request.slave_host.is_empty() {
        return Err(GeoRepError::precondition("slave host is required"));
    }
    if request.slave_volume.is_empty() {
        return Err(GeoRepError::precondition("slave volume is required"));
    }
    Ok(())
}

/// `... <master> <slave>::<vol> create [ssh-port <port>] <option> [force]`
pub fn create_command(master: &str, request: &GeoReplicationRequest) -> Result<String> {
    ensure_slave(request)?;

    let option = match request.param("option") {
        Some(opt) if CREATE_OPTIONS.contains(&opt) => opt,
        Some(opt) => {
            return Err(GeoRepError::precondition(format!(
                "invalid create option '{}', expected push-pem or no-verify",
                opt
            )))
        }
        None => {
            return Err(GeoRepError::precondition(
                "create requires option push-pem or no-verify",
            ))
        }
    };

    let mut cmd = format!(
        "{} {} {} create",
        GEOREP,
        master,
        request.slave_endpoint()
    );
    if request.slave_ssh_port != 0 {
        cmd.push_str(&format!(" ssh-port {}", request.slave_ssh_port));
    }
    cmd.push(' ');
    cmd.push_str(option);

    if request.is_forced() {
        cmd.push_str(" force");
    }

    Ok(cmd)
}

/// One `config <key> <value>` command per recognized, valid parameter.
///
/// Unknown keys and values that fail validation are skipped so the rest of
/// the batch still applies.
pub fn config_commands(master: &str, request: &GeoReplicationRequest) -> Result<Vec<String>> {
    ensure_slave(request)?;

    let slave = request.slave_endpoint();
    let mut commands = Vec::new();

    for (key, value) in &request.action_params {
        let Some(opt) = config_option(key) else {
            warn!("Skipping unrecognized config option {}", key);
            continue;
        };

        let value = match opt.kind {
            ConfigKind::Text => value.as_str(),
            ConfigKind::Bool => match value.as_str() {
                "true" | "false" => value.as_str(),
                _ => {
                    warn!("Invalid value {} for config option {}", value, key);
                    continue;
                }
            },
            ConfigKind::Flag => match value.as_str() {
                "true" => "1",
                "false" => continue,
                _ => {
                    warn!("Invalid value {} for config option {}", value, key);
                    continue;
                }
            },
            ConfigKind::Integer => {
                if value.parse::<i64>().is_err() {
                    warn!("Invalid value {} for config option {}", value, key);
                    continue;
                }
                value.as_str()
            }
        };

        let name = opt.cli_name.unwrap_or(key.as_str());
        commands.push(format!(
            "{} {} {} config {} {}",
            GEOREP, master, slave, name, value
        ));
    }

    Ok(commands)
}

/// `... <master> <slave>::<vol> <start|stop|pause|resume|delete> [force]`
pub fn lifecycle_command(master: &str, request: &GeoReplicationRequest) -> Result<String> {
    ensure_slave(request)?;

    match request.action {
        GeoReplicationAction::Create | GeoReplicationAction::Config => {
            return Err(GeoRepError::precondition(format!(
                "{} is not a session lifecycle action",
                request.action
            )))
        }
        _ => {}
    }

    let mut cmd = format!(
        "{} {} {} {}",
        GEOREP,
        master,
        request.slave_endpoint(),
        request.action
    );
    if request.is_forced() {
        cmd.push_str(" force");
    }
    Ok(cmd)
}

/// All commands `request.action` would run against `master`
pub fn for_request(master: &str, request: &GeoReplicationRequest) -> Result<Vec<String>> {
    match request.action {
        GeoReplicationAction::Create => Ok(vec![create_command(master, request)?]),
        GeoReplicationAction::Config => config_commands(master, request),
        _ => Ok(vec![lifecycle_command(master, request)?]),
    }
}

/// Status of every session on the host
pub fn global_status_command() -> String {
    format!("{} status --xml", GEOREP)
}

/// Status of the sessions of one master volume
pub fn volume_status_command(volume: &str) -> String {
    format!("{} {} status --xml", GEOREP, volume)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX: &str =
        "gluster --mode=script volume geo-replication mastervolume slavehost::slavevolume";

    fn request(action: GeoReplicationAction) -> GeoReplicationRequest {
        GeoReplicationRequest::new(action, "slavehost", "slavevolume")
    }

    fn config(params: &[(&str, &str)]) -> Vec<String> {
        let mut req = request(GeoReplicationAction::Config);
        for (k, v) in params {
            req = req.with_param(*k, *v);
        }
        config_commands("mastervolume", &req).unwrap()
    }

    #[test]
    fn test_create_with_ssh_port() {
        let req = request(GeoReplicationAction::Create)
            .with_param("option", "no-verify")
            .with_ssh_port(2222);

        assert_eq!(
            create_command("mastervolume", &req).unwrap(),
            format!("{} create ssh-port 2222 no-verify", PREFIX)
        );
    }

    #[test]
    fn test_create_without_ssh_port() {
        let req = request(GeoReplicationAction::Create).with_param("option", "push-pem");
        let cmd = create_command("mastervolume", &req).unwrap();

        assert_eq!(cmd, format!("{} create push-pem", PREFIX));
        assert!(!cmd.contains("ssh-port"));
    }

    #[test]
    fn test_create_force() {
        let req = request(GeoReplicationAction::Create)
            .with_param("option", "push-pem")
            .with_param("force", "true");
        assert_eq!(
            create_command("mastervolume", &req).unwrap(),
            format!("{} create push-pem force", PREFIX)
        );

        let req = request(GeoReplicationAction::Create)
            .with_param("option", "push-pem")
            .with_param("force", "false");
        assert!(!create_command("mastervolume", &req).unwrap().ends_with("force"));

        let req = request(GeoReplicationAction::Create)
            .with_param("option", "no-verify")
            .with_force(true);
        assert!(create_command("mastervolume", &req).unwrap().ends_with("no-verify force"));
    }

    #[test]
    fn test_create_rejects_bad_option() {
        let missing = request(GeoReplicationAction::Create);
        assert!(create_command("mastervolume", &missing)
            .unwrap_err()
            .is_precondition());

        for bad in ["", "push_pem", "verify", "PUSH-PEM"] {
            let req = request(GeoReplicationAction::Create).with_param("option", bad);
            assert!(
                create_command("mastervolume", &req).unwrap_err().is_precondition(),
                "option {:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_missing_slave_rejected() {
        let req = GeoReplicationRequest::new(GeoReplicationAction::Create, "", "slavevolume")
            .with_param("option", "push-pem");
        assert!(create_command("mastervolume", &req).unwrap_err().is_precondition());

        let req = GeoReplicationRequest::new(GeoReplicationAction::Config, "slavehost", "")
            .with_param("timeout", "10");
        assert!(config_commands("mastervolume", &req).unwrap_err().is_precondition());
    }

    #[test]
    fn test_config_batch() {
        let commands = config(&[
            ("checkpoint", "now"),
            ("use-tarssh", "true"),
            ("ignore-deletes", "true"),
            ("sync-jobs", "10"),
            ("ssh-port", "2222"),
        ]);

        assert_eq!(commands.len(), 5);
        for want in [
            "config checkpoint now",
            "config use-tarssh true",
            "config ignore-deletes 1",
            "config sync-jobs 10",
            "config ssh_port 2222",
        ] {
            let want = format!("{} {}", PREFIX, want);
            assert!(commands.contains(&want), "missing {}", want);
        }
    }

    #[test]
    fn test_config_ignore_deletes() {
        assert!(config(&[("ignore-deletes", "false")]).is_empty());
        assert!(config(&[("ignore-deletes", "yes")]).is_empty());
        assert_eq!(
            config(&[("ignore-deletes", "true")]),
            vec![format!("{} config ignore-deletes 1", PREFIX)]
        );
    }

    #[test]
    fn test_config_ssh_port_renamed() {
        let commands = config(&[("ssh-port", "2222")]);
        assert_eq!(commands, vec![format!("{} config ssh_port 2222", PREFIX)]);
        assert!(config(&[("ssh-port", "twenty")]).is_empty());
    }

    #[test]
    fn test_config_skips_invalid_but_keeps_rest() {
        let commands = config(&[
            ("timeout", "soon"),
            ("sync-jobs", "3.5"),
            ("use-meta-volume", "maybe"),
            ("log-level", "DEBUG"),
            ("no-such-option", "1"),
            ("option", "push-pem"),
        ]);

        assert_eq!(commands, vec![format!("{} config log-level DEBUG", PREFIX)]);
    }

    #[test]
    fn test_config_string_values_verbatim() {
        let commands = config(&[("ssh-command", "ssh -i /root/.ssh/id_rsa")]);
        assert_eq!(
            commands,
            vec![format!("{} config ssh-command ssh -i /root/.ssh/id_rsa", PREFIX)]
        );
    }

    #[test]
    fn test_lifecycle_commands() {
        assert_eq!(
            lifecycle_command("mastervolume", &request(GeoReplicationAction::Start)).unwrap(),
            format!("{} start", PREFIX)
        );
        assert_eq!(
            lifecycle_command(
                "mastervolume",
                &request(GeoReplicationAction::Stop).with_force(true)
            )
            .unwrap(),
            format!("{} stop force", PREFIX)
        );
        assert!(lifecycle_command("mastervolume", &request(GeoReplicationAction::Config))
            .unwrap_err()
            .is_precondition());
    }

    #[test]
    fn test_for_request() {
        let create = request(GeoReplicationAction::Create).with_param("option", "push-pem");
        assert_eq!(for_request("mastervolume", &create).unwrap().len(), 1);
        assert!(for_request("mastervolume", &request(GeoReplicationAction::Create)).is_err());

        let config = request(GeoReplicationAction::Config).with_param("bogus", "1");
        assert!(for_request("mastervolume", &config).unwrap().is_empty());

        assert_eq!(
            for_request("mastervolume", &request(GeoReplicationAction::Resume)).unwrap(),
            vec![format!("{} resume", PREFIX)]
        );
    }

    #[test]
    fn test_status_commands() {
        assert_eq!(
            global_status_command(),
            "gluster --mode=script volume geo-replication status --xml"
        );
        assert_eq!(
            volume_status_command("vol_1"),
            "gluster --mode=script volume geo-replication vol_1 status --xml"
        );
    }
}
