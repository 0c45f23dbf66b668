use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::Result;

/// Batch processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Upper bound on extracting a single file. `None` waits indefinitely.
    #[serde(default)]
    pub file_timeout_secs: Option<u64>,
    /// How many entries `recent()` returns from the processed-file log
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_recent_limit() -> usize {
    5
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            file_timeout_secs: None,
            recent_limit: default_recent_limit(),
        }
    }
}

impl BatchConfig {
    /// Load configuration from `PAGERUSH__*` environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_env("PAGERUSH")
    }

    /// Load configuration from environment with custom prefix
    pub fn load_from_env(prefix: &str) -> Result<Self> {
        Ok(Self::builder()?
            .add_source(environment(prefix))
            .build()?
            .try_deserialize()?)
    }

    /// Load configuration from file with environment overrides. A missing
    /// file leaves the defaults in place.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::builder()?
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(environment("PAGERUSH"))
            .build()?
            .try_deserialize()?)
    }

    fn builder() -> std::result::Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder().set_default("recent_limit", default_recent_limit() as i64)
    }

    pub fn with_file_timeout(mut self, timeout: Duration) -> Self {
        self.file_timeout_secs = Some(timeout.as_secs());
        self
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit;
        self
    }

    pub fn file_timeout(&self) -> Option<Duration> {
        self.file_timeout_secs.map(Duration::from_secs)
    }
}

fn environment(prefix: &str) -> Environment {
    Environment::with_prefix(prefix)
        .separator("__")
        .try_parsing(true)
}
