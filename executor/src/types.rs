use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Actions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoReplicationAction {
    Create,
    Config,
    Start,
    Stop,
    Pause,
    Resume,
    Delete,
}

impl GeoReplicationAction {
    /// The verb as the gluster CLI spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            GeoReplicationAction::Create => "create",
            GeoReplicationAction::Config => "config",
            GeoReplicationAction::Start => "start",
            GeoReplicationAction::Stop => "stop",
            GeoReplicationAction::Pause => "pause",
            GeoReplicationAction::Resume => "resume",
            GeoReplicationAction::Delete => "delete",
        }
    }
}

impl fmt::Display for GeoReplicationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Requests
// ============================================================================

/// A geo-replication request against one master volume.
///
/// `action_params` is an open bag of CLI options; which keys are honored
/// depends on the action (see [`crate::commands`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoReplicationRequest {
    pub action: GeoReplicationAction,
    #[serde(default)]
    pub action_params: BTreeMap<String, String>,
    #[serde(default)]
    pub slave_host: String,
    #[serde(default)]
    pub slave_volume: String,
    /// 0 leaves the port to the CLI default
    #[serde(default)]
    pub slave_ssh_port: u16,
    #[serde(default)]
    pub force: bool,
}

impl GeoReplicationRequest {
    pub fn new(
        action: GeoReplicationAction,
        slave_host: impl Into<String>,
        slave_volume: impl Into<String>,
    ) -> Self {
        Self {
            action,
            action_params: BTreeMap::new(),
            slave_host: slave_host.into(),
            slave_volume: slave_volume.into(),
            slave_ssh_port: 0,
            force: false,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.action_params.insert(key.into(), value.into());
        self
    }

    pub fn with_ssh_port(mut self, port: u16) -> Self {
        self.slave_ssh_port = port;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.action_params.get(key).map(String::as_str)
    }

    /// Force is requested either by flag or as `force=true` in the params
    pub fn is_forced(&self) -> bool {
        self.force || self.param("force") == Some("true")
    }

    /// `slavehost::slavevolume`, the CLI's slave endpoint notation
    pub fn slave_endpoint(&self) -> String {
        format!("{}::{}", self.slave_host, self.slave_volume)
    }
}
