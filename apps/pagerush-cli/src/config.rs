//! CLI configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Defaults read from `~/.config/pagerush/config.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CliConfig {
    /// Default output format
    pub output_format: Option<String>,
    /// Directory for per-file exports
    pub output_dir: Option<PathBuf>,
    /// Owner id used when filing documents
    pub owner: Option<String>,
    /// Per-file extraction timeout in seconds
    pub file_timeout_secs: Option<u64>,
}

impl CliConfig {
    /// Load configuration from default path
    pub fn load() -> anyhow::Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from `path`, or defaults when it does not exist
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the default configuration file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Batch settings (timeout, recent-file count), read by the library's
    /// own loader with `PAGERUSH__*` overrides
    pub fn batch_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("batch.toml"))
    }

    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pagerush"))
    }
}
