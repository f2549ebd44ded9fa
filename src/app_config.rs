use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::default::Default;
use std::path::{Path, PathBuf};

use crate::providers::BackendId;
use crate::translation::markup::NonTranslatableRules;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Backend used when a request does not name one
    #[serde(default = "default_backend")]
    pub default_backend: BackendId,

    /// Domain hint passed to backends that support one
    #[serde(default)]
    pub default_category: Option<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Configured translation backends
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,

    /// Segmentation settings
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Document lock settings
    #[serde(default)]
    pub lock: LockConfig,

    /// Translation store settings
    #[serde(default)]
    pub database: DatabaseConfig,
}

/// Backend configuration entry
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BackendConfig {
    /// Backend identifier
    #[serde(rename = "id")]
    pub backend: BackendId,

    /// API key
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Service URL, empty for the public endpoint
    #[serde(default = "String::new")]
    pub endpoint: String,

    /// Service region (Microsoft only)
    #[serde(default)]
    pub region: Option<String>,

    /// Max chars per request
    #[serde(default = "default_char_limit")]
    pub char_limit: usize,

    /// Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub max_retries: u32,

    /// Backoff base for retries (in milliseconds), doubled on each retry
    #[serde(default = "default_retry_backoff_ms")]
    pub backoff_base_ms: u64,

    /// Max concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Locale code overrides, e.g. `{"zh-CN": "zh-Hans"}`
    #[serde(default)]
    pub locale_map: HashMap<String, String>,
}

impl BackendConfig {
    /// Backend config with defaults
    pub fn new(backend: BackendId) -> Self {
        Self {
            backend,
            api_key: String::new(),
            endpoint: String::new(),
            region: None,
            char_limit: default_char_limit(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_retry_count(),
            backoff_base_ms: default_retry_backoff_ms(),
            concurrent_requests: default_concurrent_requests(),
            locale_map: HashMap::new(),
        }
    }

    /// Whether this backend needs an API key
    pub fn requires_api_key(&self) -> bool {
        self.backend != BackendId::Dev
    }
}

/// Segmentation settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SegmentationConfig {
    /// Prefix of placeholder ids for masked elements
    #[serde(default = "default_placeholder_prefix")]
    pub placeholder_prefix: String,

    /// Markup never sent for translation
    #[serde(default)]
    pub non_translatable: NonTranslatableRules,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            placeholder_prefix: default_placeholder_prefix(),
            non_translatable: NonTranslatableRules::default(),
        }
    }
}

/// Where document lock leases are kept
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LockStoreKind {
    /// Process-local
    #[default]
    Memory,
    /// Shared through the translation store
    Database,
}

/// Document lock settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LockConfig {
    #[serde(default)]
    pub store: LockStoreKind,

    /// Seconds before an abandoned lock can be taken over
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Seconds to wait for a lock before failing the request
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// Milliseconds between attempts while waiting
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            store: LockStoreKind::default(),
            lease_secs: default_lease_secs(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Translation store settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct DatabaseConfig {
    /// Database file, empty for the user data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_backend() -> BackendId {
    BackendId::Dev
}

fn default_backends() -> Vec<BackendConfig> {
    vec![BackendConfig::new(BackendId::Dev)]
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_char_limit() -> usize {
    10_000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000
}

fn default_placeholder_prefix() -> String {
    "ZNTA".to_string()
}

fn default_lease_secs() -> u64 {
    300
}

fn default_acquire_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    100
}

impl Config {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Write configuration as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.get_backend_config(self.default_backend).is_none() {
            return Err(anyhow!(
                "Default backend {} is not configured",
                self.default_backend
            ));
        }

        let mut seen = Vec::new();
        for backend in &self.backends {
            if seen.contains(&backend.backend) {
                return Err(anyhow!("Backend {} is configured twice", backend.backend));
            }
            seen.push(backend.backend);

            if backend.requires_api_key() && backend.api_key.is_empty() {
                return Err(anyhow!("API key is required for the {} backend", backend.backend));
            }
            if backend.char_limit == 0 {
                return Err(anyhow!("char_limit must be greater than 0 for {}", backend.backend));
            }
            if backend.concurrent_requests == 0 {
                return Err(anyhow!(
                    "concurrent_requests must be greater than 0 for {}",
                    backend.backend
                ));
            }
            for (from, to) in &backend.locale_map {
                crate::language_utils::get_language_name(from)
                    .with_context(|| format!("Invalid locale_map entry {} -> {}", from, to))?;
            }
        }

        if self.segmentation.placeholder_prefix.trim().is_empty()
            || !self
                .segmentation
                .placeholder_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(anyhow!(
                "Invalid placeholder prefix: {:?}",
                self.segmentation.placeholder_prefix
            ));
        }

        if self.lock.lease_secs == 0 || self.lock.poll_interval_ms == 0 {
            return Err(anyhow!("Lock lease and poll interval must be greater than 0"));
        }

        Ok(())
    }

    /// Configuration of one backend
    pub fn get_backend_config(&self, backend: BackendId) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.backend == backend)
    }

    /// Concurrent requests of the default backend
    pub fn concurrent_requests(&self) -> usize {
        self.get_backend_config(self.default_backend)
            .map(|b| b.concurrent_requests)
            .unwrap_or_else(default_concurrent_requests)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            default_backend: default_backend(),
            default_category: None,
            log_level: LogLevel::default(),
            backends: default_backends(),
            segmentation: SegmentationConfig::default(),
            lock: LockConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}
