//! Geo-replication session management for gluster volumes.
//!
//! Requests are turned into `gluster volume geo-replication` command lines,
//! run on a management host through a [`RemoteExecutor`], and status replies
//! are parsed from the CLI's `--xml` output into a [`ClusterStatus`] tree.

pub mod commands;
pub mod error;
pub mod exec;
pub mod session;
pub mod status;
pub mod types;

pub use error::{GeoRepError, Result};
pub use exec::{ExecutorConfig, ExecutorKind, LocalExecutor, MockExecutor, RemoteExecutor, SshExecutor};
pub use session::SessionManager;
pub use status::{CliOutput, ClusterStatus, PairStatus, SessionStatus, VolumeStatus};
pub use types::{GeoReplicationAction, GeoReplicationRequest};
