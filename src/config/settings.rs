use serde::Deserialize;
use std::time::Duration;

use crate::utils::constants::{DEFAULT_BASE_URL, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_STORAGE_PATH};

/// ================================
/// Full client configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    pub logging: Option<LoggingConfig>,
}

/// ================================
/// Backend
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    /// e.g. http://localhost:8000/api
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: None,
            user_agent: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS))
    }
}

/// ================================
/// Durable storage for the refresh token and user snapshot
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    #[serde(default)]
    pub kind: StorageKind,
    /// required for kind = file
    pub path: Option<String>,
}

impl StorageConfig {
    pub fn path_or_default(&self) -> String {
        self.path
            .clone()
            .unwrap_or_else(|| DEFAULT_STORAGE_PATH.to_owned())
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    #[default]
    File,
    Memory,
}

/// ================================
/// Query cache
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct CacheConfig {
    /// TTL for groups that are not account scoped (schemes, regions, discussions).
    /// Account scoped groups never expire by time.
    pub default_ttl_seconds: Option<u64>,
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl_seconds.map(Duration::from_secs)
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
