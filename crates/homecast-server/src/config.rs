//! Configuration loading and parsing.
//!
//! Defines the server config schema and resolves defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Top-level server configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    /// Media library root; relative paths in commands resolve
    /// against it.
    pub media_dir: Option<PathBuf>,
    /// Friendly name of the cast receiver to bind; absent means play locally.
    pub cast_device: Option<String>,
    /// Optional playlist persistence file (one path per line).
    pub playlist_path: Option<PathBuf>,
    /// Public base URL used to build stream URLs for the cast receiver.
    /// When unset, raw file paths are sent as-is.
    pub media_base_url: Option<String>,
    /// Synchronizer sampling cadence in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// Bound on cast device discovery, in seconds.
    pub discovery_timeout_secs: Option<u64>,
}

impl ServerConfig {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    /// Load config if the file exists, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                tracing::warn!(path = %path.display(), "config file missing; using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(1_000))
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_secs.unwrap_or(5))
    }
}
