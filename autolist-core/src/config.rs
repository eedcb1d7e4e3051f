//! Updater configuration, loaded from `<home>/.autolist/config.yaml`.
//!
//! Every field is defaulted, so a missing file or a partial file is valid.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, ConfigError, StoreError};
use crate::paths;

pub const DEFAULT_TICK_COUNT: usize = 50;
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "autolist-rebuild";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Members written per committed batch during a full rebuild.
    pub tick_count: usize,
    /// Upper bound on waiting for another batch to release a key.
    /// `None` waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_wait_timeout_ms: Option<u64>,
    pub worker_thread_name_prefix: String,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            tick_count: DEFAULT_TICK_COUNT,
            lock_wait_timeout_ms: None,
            worker_thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
        }
    }
}

impl UpdaterConfig {
    pub fn with_tick_count(mut self, tick_count: usize) -> Self {
        self.tick_count = tick_count;
        self
    }

    pub fn with_lock_wait_timeout(mut self, timeout: Duration) -> Self {
        self.lock_wait_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn lock_wait_timeout(&self) -> Option<Duration> {
        self.lock_wait_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_count == 0 {
            return Err(ConfigError::InvalidTickCount);
        }
        if self.worker_thread_name_prefix.trim().is_empty() {
            return Err(ConfigError::EmptyThreadName);
        }
        Ok(())
    }
}

/// Load `<home>/.autolist/config.yaml`, falling back to defaults when absent.
pub fn load_at(home: &Path) -> Result<UpdaterConfig, StoreError> {
    let path = paths::config_path(home);
    if !path.exists() {
        return Ok(UpdaterConfig::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(UpdaterConfig::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| StoreError::Parse { path, source })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<UpdaterConfig, StoreError> {
    load_at(&paths::home()?)
}

/// Write `<home>/.autolist/config.yaml` atomically.
pub fn save_at(home: &Path, config: &UpdaterConfig) -> Result<(), StoreError> {
    let path = paths::config_path(home);
    let yaml = serde_yaml::to_string(config)?;
    crate::store::write_atomic(&path, &yaml)
}
