//! Configuration loading
//!
//! Settings live in `~/.agentpulse/config.toml`; a missing file means
//! defaults. CLI flags override whatever was loaded.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::aggregator::DEFAULT_WORKER_COUNT;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the metrics database; defaults to `<data dir>/metrics.db`
    pub db_path: Option<PathBuf>,
    /// Worker pool size for aggregation passes
    pub worker_count: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { db_path: None, worker_count: DEFAULT_WORKER_COUNT }
    }
}

impl Config {
    /// `~/.agentpulse` (falls back to the current directory when no home
    /// directory can be determined)
    pub fn data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".agentpulse")
    }

    /// Load the global config file, or defaults when it does not exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::data_dir().join("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("invalid config: {}", path.display()))
    }

    /// Resolve the database path, preferring the configured one
    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("metrics.db"))
    }
}
