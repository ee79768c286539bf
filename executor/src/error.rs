use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GeoRepError>;

#[derive(Debug, Error)]
pub enum GeoRepError {
    /// Rejected before any command reached a host
    #[error("invalid geo-replication request: {0}")]
    Precondition(String),

    #[error("command failed on {host} (exit code {exit_code:?}): {command}: {stderr}")]
    CommandFailed {
        host: String,
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("unable to run commands on {host}: {source}")]
    Transport {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("commands on {host} timed out after {after:?}")]
    Timeout { host: String, after: Duration },

    #[error("unable to determine geo-replication status for {target}: {detail}")]
    MalformedResponse { target: String, detail: String },
}

impl GeoRepError {
    pub fn precondition(msg: impl Into<String>) -> Self {
        GeoRepError::Precondition(msg.into())
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, GeoRepError::Precondition(_))
    }
}
