use std::sync::Arc;
use tracing::{debug, info};

use crate::commands;
use crate::error::{GeoRepError, Result};
use crate::exec::RemoteExecutor;
use crate::status::{self, ClusterStatus, SessionStatus};
use crate::types::{GeoReplicationAction, GeoReplicationRequest};

pub const DEFAULT_TIMEOUT_MINUTES: u64 = 10;

/// Geo-replication session operations against a management host.
///
/// Every request is validated before anything is sent to the host. Calls
/// for the same volume are not serialized here; callers that run them
/// concurrently must provide their own single-flight discipline.
#[derive(Clone)]
pub struct SessionManager {
    executor: Arc<dyn RemoteExecutor>,
    timeout_minutes: u64,
}

impl SessionManager {
    pub fn new(executor: Arc<dyn RemoteExecutor>) -> Self {
        Self {
            executor,
            timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
        }
    }

    pub fn with_timeout_minutes(mut self, timeout_minutes: u64) -> Self {
        self.timeout_minutes = timeout_minutes;
        self
    }

    pub fn timeout_minutes(&self) -> u64 {
        self.timeout_minutes
    }

    /// Run the operation `request.action` names
    pub async fn action(
        &self,
        host: &str,
        master: &str,
        request: &GeoReplicationRequest,
    ) -> Result<()> {
        match request.action {
            GeoReplicationAction::Create => self.create(host, master, request).await,
            GeoReplicationAction::Config => self.config(host, master, request).await,
            _ => self.lifecycle(host, master, request).await,
        }
    }

    /// Create the session. The CLI's reply is not status XML and is dropped.
    pub async fn create(
        &self,
        host: &str,
        master: &str,
        request: &GeoReplicationRequest,
    ) -> Result<()> {
        require(host, "host")?;
        require(master, "master volume")?;
        let cmd = commands::create_command(master, request)?;

        info!(
            "Creating geo-replication session {} -> {} via {}",
            master,
            request.slave_endpoint(),
            host
        );
        self.executor
            .execute(host, &[cmd], self.timeout_minutes)
            .await?;
        Ok(())
    }

    /// Apply every valid config option as one batch.
    ///
    /// Options already applied before a failing command stay applied.
    pub async fn config(
        &self,
        host: &str,
        master: &str,
        request: &GeoReplicationRequest,
    ) -> Result<()> {
        require(host, "host")?;
        require(master, "master volume")?;
        let cmds = commands::config_commands(master, request)?;

        if cmds.is_empty() {
            debug!("No valid config options for {}, nothing to run", master);
            return Ok(());
        }

        info!(
            "Configuring geo-replication session {} -> {}: {} option(s)",
            master,
            request.slave_endpoint(),
            cmds.len()
        );
        self.executor
            .execute(host, &cmds, self.timeout_minutes)
            .await?;
        Ok(())
    }

    /// start, stop, pause, resume or delete the session
    pub async fn lifecycle(
        &self,
        host: &str,
        master: &str,
        request: &GeoReplicationRequest,
    ) -> Result<()> {
        require(host, "host")?;
        require(master, "master volume")?;
        let cmd = commands::lifecycle_command(master, request)?;

        info!(
            "Running {} on geo-replication session {} -> {}",
            request.action,
            master,
            request.slave_endpoint()
        );
        self.executor
            .execute(host, &[cmd], self.timeout_minutes)
            .await?;
        Ok(())
    }

    /// Every session known to `host`
    pub async fn global_status(&self, host: &str) -> Result<ClusterStatus> {
        require(host, "host")?;

        let output = self
            .executor
            .execute(host, &[commands::global_status_command()], self.timeout_minutes)
            .await?;

        Ok(status::parse_first(&output, host)?.geo_rep)
    }

    /// Sessions of `volume`; empty when the volume has none
    pub async fn volume_status(&self, host: &str, volume: &str) -> Result<Vec<SessionStatus>> {
        require(host, "host")?;
        require(volume, "volume")?;

        let output = self
            .executor
            .execute(
                host,
                &[commands::volume_status_command(volume)],
                self.timeout_minutes,
            )
            .await?;

        let parsed = status::parse_first(&output, volume)?;
        Ok(parsed.geo_rep.into_sessions(volume))
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(GeoRepError::precondition(format!("{} is required", what)));
    }
    Ok(())
}
