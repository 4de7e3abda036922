//! Server configuration.
//!
//! Defaults can be replaced by a YAML file named in `COURIER_CONFIG`:
//!
//! ```yaml
//! server:
//!   listen_addr: "0.0.0.0:8080"
//!   max_request_bytes: 8388608
//!   idle_timeout_secs: 30
//! storage:
//!   web_root: /var/www
//!   upload_root: /var/www/uploads
//! ```
//!
//! Environment variables `LISTEN`, `WEB_ROOT`, `UPLOAD_ROOT`,
//! `MAX_REQUEST_BYTES` and `IDLE_TIMEOUT_SECS` override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Upper bound on a buffered request, headers and body together.
    pub max_request_bytes: usize,
    /// Close connections that make no progress for this long; `0` disables.
    pub idle_timeout_secs: u64,
    /// Readiness events fetched per poll.
    pub max_events: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            max_request_bytes: 8 * 1024 * 1024,
            idle_timeout_secs: 30,
            max_events: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory static GET requests are served from.
    pub web_root: PathBuf,
    /// Directory uploaded files are written to.
    pub upload_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            web_root: PathBuf::from("./www"),
            upload_root: PathBuf::from("./www/uploads"),
        }
    }
}

impl Config {
    /// Loads the optional config file, then applies environment overrides.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var("COURIER_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        cfg.apply_env()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        Self::from_yaml(&text)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(text).context("failed to parse configuration")
    }

    fn apply_env(&mut self) -> anyhow::Result<()> {
        if let Ok(addr) = std::env::var("LISTEN") {
            self.server.listen_addr = addr;
        }
        if let Ok(root) = std::env::var("WEB_ROOT") {
            self.storage.web_root = PathBuf::from(root);
        }
        if let Ok(root) = std::env::var("UPLOAD_ROOT") {
            self.storage.upload_root = PathBuf::from(root);
        }
        if let Ok(limit) = std::env::var("MAX_REQUEST_BYTES") {
            self.server.max_request_bytes = limit
                .parse()
                .with_context(|| format!("invalid MAX_REQUEST_BYTES {:?}", limit))?;
        }
        if let Ok(secs) = std::env::var("IDLE_TIMEOUT_SECS") {
            self.server.idle_timeout_secs = secs
                .parse()
                .with_context(|| format!("invalid IDLE_TIMEOUT_SECS {:?}", secs))?;
        }
        Ok(())
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        match self.server.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
