//! Engine configuration.
//!
//! Modeled on `AppConfig` from the teacher's `core-new/src/config/app_config.rs`:
//! a versioned, serde-backed struct loaded from and saved to a TOML file on
//! disk, with a small migration hook for future schema changes.

mod migration;

pub use migration::Migrate;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fs;
use tracing::{info, warn};

/// Recognized engine configuration (`spec.md` §6 "Configuration").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Config schema version.
    pub version: u32,

    /// Mount root the Indexer walks.
    pub root_path: PathBuf,

    /// Path-prefix allow-list every path-taking operation is checked against.
    pub allowed_roots: Vec<PathBuf>,

    pub worker_count_default: u32,
    pub max_concurrent_files_default: u32,
    pub poll_interval_default_ms: u64,

    pub read_timeout_ms: u64,
    pub index_batch_size: usize,
    pub directory_size_cache_ttl_ms: i64,
    pub shutdown_timeout_ms: u64,

    /// How long a worker's claim on a `JobItem` is honored before a janitor
    /// pass may requeue it (resolves Open Question 1 in `spec.md` §9).
    pub item_lease_ms: i64,

    /// Bound on directory roll-up recursion depth (Open Question 3).
    pub rollup_max_depth: u32,
}

impl EngineConfig {
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join("teamcache.toml");

        if config_path.exists() {
            info!("loading config from {:?}", config_path);
            let raw = fs::read_to_string(&config_path)?;
            let mut config: EngineConfig = toml::from_str(&raw)?;

            if config.version < Self::target_version() {
                info!(
                    "migrating config from v{} to v{}",
                    config.version,
                    Self::target_version()
                );
                config.migrate()?;
                config.save(data_dir)?;
            }

            Ok(config)
        } else {
            warn!("no config found at {:?}, refusing to guess root_path", config_path);
            Err(anyhow!("missing config file at {}", config_path.display()))
        }
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        fs::create_dir_all(data_dir)?;
        let config_path = data_dir.join("teamcache.toml");
        let raw = toml::to_string_pretty(self)?;
        fs::write(&config_path, raw)?;
        info!("saved config to {:?}", config_path);
        Ok(())
    }

    pub fn with_root(root_path: PathBuf) -> Self {
        Self {
            version: Self::target_version(),
            allowed_roots: vec![root_path.clone()],
            root_path,
            worker_count_default: 4,
            max_concurrent_files_default: 8,
            poll_interval_default_ms: 500,
            read_timeout_ms: 10_000,
            index_batch_size: 500,
            directory_size_cache_ttl_ms: 3_600_000,
            shutdown_timeout_ms: 30_000,
            item_lease_ms: 60_000,
            rollup_max_depth: 20,
        }
    }

    /// Check `path` against `allowed_roots`, returning `PathDenied` on miss.
    pub fn check_allowed(&self, path: &Path) -> crate::error::EngineResult<()> {
        let allowed = self
            .allowed_roots
            .iter()
            .any(|root| path.starts_with(root));
        if allowed {
            Ok(())
        } else {
            Err(crate::error::EngineError::PathDenied(
                path.display().to_string(),
            ))
        }
    }
}

impl Migrate for EngineConfig {
    fn current_version(&self) -> u32 {
        self.version
    }

    fn target_version() -> u32 {
        1
    }

    fn migrate(&mut self) -> Result<()> {
        match self.version {
            0 => {
                self.version = 1;
                Ok(())
            }
            1 => Ok(()),
            v => Err(anyhow!("unknown config version: {}", v)),
        }
    }
}
