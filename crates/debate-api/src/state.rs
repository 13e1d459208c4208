//! Application state wiring configuration, store and credentials together.
//!
//! The conversation service is generic over the store trait; AppState pins it
//! to the type-erased store chosen at startup from configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use debate_core::auth::credential_cache::CredentialCache;
use debate_core::context::RequestContext;
use debate_core::repository::box_store::BoxConversationStore;
use debate_core::repository::secret::BoxSecretFetcher;
use debate_core::service::conversation::ConversationService;
use debate_infra::config::{load_config, resolve_data_dir};
use debate_infra::secret::build_secret_fetcher;
use debate_infra::store::open_store;
use debate_types::config::AppConfig;

/// Upper bound on any single command's store or secret calls.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub type ConcreteConversationService = ConversationService<BoxConversationStore>;
pub type ConcreteCredentialCache = CredentialCache<BoxSecretFetcher>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub data_dir: PathBuf,
    pub conversations: Arc<ConcreteConversationService>,
    pub credentials: Arc<ConcreteCredentialCache>,
}

impl AppState {
    /// Load configuration and open the configured store.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_config(&data_dir).await;

        let store = open_store(&config.storage, &data_dir)
            .await
            .with_context(|| format!("Failed to open {} conversation store", config.storage.backend))?;

        let credentials = CredentialCache::with_ttl(
            build_secret_fetcher(&config.auth),
            Duration::from_secs(config.auth.cache_ttl_secs),
        );

        Ok(Self {
            config,
            data_dir,
            conversations: Arc::new(ConversationService::new(store)),
            credentials: Arc::new(credentials),
        })
    }

    /// A fresh context bounded by [`REQUEST_TIMEOUT`].
    pub fn request_context(&self) -> RequestContext {
        RequestContext::with_timeout(REQUEST_TIMEOUT)
    }
}
