//! Configuration types for the debate store.
//!
//! `AppConfig` represents `config.toml` in the data directory. Every field
//! has a default so a missing file or section yields a working setup backed
//! by the in-memory store with authentication disabled.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub auth: AuthConfig,
}

/// Which conversation store to open at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Redis,
    Sqlite,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::Memory => write!(f, "memory"),
            StorageBackend::Redis => write!(f, "redis"),
            StorageBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "redis" => Ok(StorageBackend::Redis),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Storage settings (`[storage]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Redis connection URL, e.g. `redis://localhost:6379/0`.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Namespace prepended to every conversation key.
    #[serde(default = "default_redis_key_prefix")]
    pub redis_key_prefix: String,

    /// Expiry applied to every conversation write.
    #[serde(default = "default_redis_ttl_secs")]
    pub redis_ttl_secs: u64,

    /// SQLite URL. Defaults to `debate.db` inside the data directory.
    #[serde(default)]
    pub database_url: Option<String>,

    /// Open the in-memory store when the configured backend is unreachable.
    #[serde(default = "default_true")]
    pub fallback_to_memory: bool,

    /// Upper bound on the startup connectivity probe.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_redis_key_prefix() -> String {
    "convo:".to_string()
}

fn default_redis_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout_ms() -> u64 {
    500
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            redis_url: None,
            redis_key_prefix: default_redis_key_prefix(),
            redis_ttl_secs: default_redis_ttl_secs(),
            database_url: None,
            fallback_to_memory: default_true(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Where the expected API key is fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretSource {
    #[default]
    Env,
    Keychain,
}

impl fmt::Display for SecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretSource::Env => write!(f, "env"),
            SecretSource::Keychain => write!(f, "keychain"),
        }
    }
}

impl FromStr for SecretSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "env" => Ok(SecretSource::Env),
            "keychain" => Ok(SecretSource::Keychain),
            other => Err(ConfigError::UnknownSecretSource(other.to_string())),
        }
    }
}

/// Authentication settings (`[auth]`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub source: SecretSource,

    /// Environment variable name or keychain account holding the API key.
    #[serde(default = "default_secret_name")]
    pub secret_name: String,

    #[serde(default = "default_keychain_service")]
    pub keychain_service: String,

    /// How long a fetched key is trusted before it is fetched again.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_secret_name() -> String {
    "DEBATE_API_KEY".to_string()
}

fn default_keychain_service() -> String {
    "debate".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    30 * 60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source: SecretSource::default(),
            secret_name: default_secret_name(),
            keychain_service: default_keychain_service(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}
