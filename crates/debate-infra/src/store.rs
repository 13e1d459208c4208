//! Startup backend selection.
//!
//! Builds the conversation store named in `[storage]`, probes it once with a
//! bounded health check, and falls back to the in-memory store when the
//! backend cannot be reached and fallback is enabled. Selection happens only
//! here; a store that fails later keeps failing rather than switching.

use std::path::Path;
use std::time::Duration;

use debate_core::context::RequestContext;
use debate_core::repository::box_store::BoxConversationStore;
use debate_core::repository::conversation::ConversationStore;
use debate_core::repository::memory::InMemoryConversationStore;
use debate_types::config::{StorageBackend, StorageConfig};
use debate_types::error::StoreError;

use crate::redis::RedisConversationStore;
use crate::sqlite::conversation::SqliteConversationStore;
use crate::sqlite::pool::default_database_url;

/// Redis URL used when `[storage] redis_url` is unset.
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";

/// Open the configured conversation store.
///
/// Returns an error only when the backend is unreachable and
/// `fallback_to_memory` is off, or when it fails for a reason other than
/// reachability.
pub async fn open_store(
    config: &StorageConfig,
    data_dir: &Path,
) -> Result<BoxConversationStore, StoreError> {
    match connect_backend(config, data_dir).await {
        Ok(store) => {
            tracing::info!(backend = store.backend_name(), "conversation store ready");
            Ok(store)
        }
        Err(err) if err.is_unavailable() && config.fallback_to_memory => {
            tracing::warn!(
                backend = %config.backend,
                error = %err,
                "configured store unreachable, falling back to in-memory store"
            );
            Ok(BoxConversationStore::new(InMemoryConversationStore::new()))
        }
        Err(err) => Err(err),
    }
}

async fn connect_backend(
    config: &StorageConfig,
    data_dir: &Path,
) -> Result<BoxConversationStore, StoreError> {
    let timeout = Duration::from_millis(config.connect_timeout_ms);

    let store = match config.backend {
        StorageBackend::Memory => {
            return Ok(BoxConversationStore::new(InMemoryConversationStore::new()));
        }
        StorageBackend::Redis => {
            let url = config.redis_url.as_deref().unwrap_or(DEFAULT_REDIS_URL);
            let connect = RedisConversationStore::connect(
                url,
                config.redis_key_prefix.clone(),
                Duration::from_secs(config.redis_ttl_secs),
            );
            BoxConversationStore::new(bounded(timeout, "connect to redis", connect).await?)
        }
        StorageBackend::Sqlite => {
            let url = match &config.database_url {
                Some(url) => url.clone(),
                None => {
                    tokio::fs::create_dir_all(data_dir).await.map_err(|e| {
                        tracing::warn!(path = %data_dir.display(), error = %e, "cannot create data directory");
                        StoreError::Unavailable("create data directory".to_string())
                    })?;
                    default_database_url(data_dir)
                }
            };
            // Opening runs migrations; only the probe below is bounded.
            BoxConversationStore::new(SqliteConversationStore::open(&url).await?)
        }
    };

    let ctx = RequestContext::with_timeout(timeout);
    store.health_check(&ctx).await.map_err(|err| match err {
        StoreError::DeadlineExceeded => StoreError::Unavailable("health check timed out".to_string()),
        other => other,
    })?;

    Ok(store)
}

async fn bounded<T, F>(timeout: Duration, operation: &'static str, fut: F) -> Result<T, StoreError>
where
    F: std::future::Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, timeout_ms = timeout.as_millis() as u64, "backend connect timed out");
            Err(StoreError::Unavailable(operation.to_string()))
        }
    }
}
