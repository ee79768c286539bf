use anyhow::{Context, Result};
use georep_executor::session::DEFAULT_TIMEOUT_MINUTES;
use georep_executor::ExecutorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Control plane settings read from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub executor: ExecutorConfig,
    /// Bound on every remote batch
    pub timeout_minutes: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            executor: ExecutorConfig::default(),
            timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
        }
    }
}

impl ControlConfig {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let bytes = fs::read(path).with_context(|| format!("Failed to read config {:?}", path))?;
        let cfg: Self = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        cfg.validate()
            .with_context(|| format!("Invalid config {:?}", path))?;
        Ok(cfg)
    }

    /// Apply a command-line timeout over the file value
    pub fn set_timeout_minutes(&mut self, minutes: u64) -> Result<()> {
        check_timeout(minutes)?;
        self.timeout_minutes = minutes;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        check_timeout(self.timeout_minutes)
    }
}

/// A zero bound would expire every batch before it starts
fn check_timeout(minutes: u64) -> Result<()> {
    if minutes == 0 {
        anyhow::bail!("timeout_minutes must be at least 1");
    }
    Ok(())
}
