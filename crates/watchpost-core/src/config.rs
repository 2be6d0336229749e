//! Application configuration management.
//!
//! Configuration is stored at `~/.config/watchpost/config.json` and then
//! overridden from `WATCHPOST_*` environment variables, so a `.env` file or
//! the shell can point the client at another proxy or backend without
//! touching the file. The file also remembers the last username used to
//! log in.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::request::DEFAULT_TIMEOUT_MS;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "watchpost";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_API_PREFIX: &str = "/api";
/// Where the local proxy boundary listens (the dev server in front of the backend)
pub const DEFAULT_PROXY_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 30_000;

pub const ENV_API_BASE_URL: &str = "WATCHPOST_API_BASE_URL";
pub const ENV_API_PREFIX: &str = "WATCHPOST_API_PREFIX";
pub const ENV_PROXY_ORIGIN: &str = "WATCHPOST_PROXY_ORIGIN";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "WATCHPOST_REQUEST_TIMEOUT_MS";
pub const ENV_REFRESH_INTERVAL: &str = "WATCHPOST_REFRESH_INTERVAL";
pub const ENV_SESSION_BACKEND: &str = "WATCHPOST_SESSION_BACKEND";

/// Where the session triplet is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl SessionBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Some(SessionBackend::File),
            "keyring" => Some(SessionBackend::Keyring),
            "memory" => Some(SessionBackend::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend origin the proxy forwards to. Only used for diagnostics.
    pub api_base_url: String,
    pub api_prefix: String,
    pub proxy_origin: String,
    pub request_timeout_ms: u64,
    pub refresh_interval_ms: u64,
    pub session_backend: SessionBackend,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            proxy_origin: DEFAULT_PROXY_ORIGIN.to_string(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            refresh_interval_ms: DEFAULT_REFRESH_INTERVAL_MS,
            session_backend: SessionBackend::default(),
            last_username: None,
        }
    }
}

impl Config {
    /// Load the config file (defaults if absent) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `WATCHPOST_*` overrides from `lookup`. Empty values are ignored,
    /// as are numbers that do not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_API_BASE_URL) {
            self.api_base_url = v;
        }
        if let Some(v) = get(ENV_API_PREFIX) {
            self.api_prefix = v;
        }
        if let Some(v) = get(ENV_PROXY_ORIGIN) {
            self.proxy_origin = v;
        }
        if let Some(v) = get(ENV_REQUEST_TIMEOUT_MS) {
            match v.trim().parse() {
                Ok(ms) => self.request_timeout_ms = ms,
                Err(_) => warn!(key = ENV_REQUEST_TIMEOUT_MS, value = %v, "Ignoring invalid timeout"),
            }
        }
        if let Some(v) = get(ENV_REFRESH_INTERVAL) {
            match v.trim().parse() {
                Ok(ms) => self.refresh_interval_ms = ms,
                Err(_) => warn!(key = ENV_REFRESH_INTERVAL, value = %v, "Ignoring invalid refresh interval"),
            }
        }
        if let Some(v) = get(ENV_SESSION_BACKEND) {
            match SessionBackend::parse(&v) {
                Some(backend) => self.session_backend = backend,
                None => warn!(key = ENV_SESSION_BACKEND, value = %v, "Ignoring unknown session backend"),
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    /// Host of the backend origin, for log records and error messages.
    pub fn backend_host(&self) -> String {
        let without_scheme = self
            .api_base_url
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&self.api_base_url);
        without_scheme
            .split('/')
            .next()
            .unwrap_or(without_scheme)
            .to_string()
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for the persisted session and log files.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }
}
