//! SecretFetcher trait and its boxed wrapper.
//!
//! A fetcher reads the current value of one secret from wherever it lives
//! (environment, OS keychain). Caching is not the fetcher's job; see
//! [`CredentialCache`](crate::auth::credential_cache::CredentialCache).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use debate_types::error::SecretError;

use crate::context::RequestContext;

/// Source of a single secret value.
pub trait SecretFetcher: Send + Sync {
    /// Human-readable provider name for logs.
    fn provider_name(&self) -> &'static str;

    /// Fetch the current value. A missing or empty secret is `SecretError::NotFound`.
    fn fetch(
        &self,
        ctx: &RequestContext,
    ) -> impl Future<Output = Result<String, SecretError>> + Send;
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe version of [`SecretFetcher`].
pub trait SecretFetcherDyn: Send + Sync {
    fn provider_name_dyn(&self) -> &'static str;

    fn fetch_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, Result<String, SecretError>>;
}

impl<T: SecretFetcher> SecretFetcherDyn for T {
    fn provider_name_dyn(&self) -> &'static str {
        self.provider_name()
    }

    fn fetch_boxed<'a>(
        &'a self,
        ctx: &'a RequestContext,
    ) -> BoxFuture<'a, Result<String, SecretError>> {
        Box::pin(self.fetch(ctx))
    }
}

/// Type-erased fetcher chosen from configuration at startup.
#[derive(Clone)]
pub struct BoxSecretFetcher {
    inner: Arc<dyn SecretFetcherDyn>,
}

impl BoxSecretFetcher {
    pub fn new<T: SecretFetcher + 'static>(fetcher: T) -> Self {
        Self {
            inner: Arc::new(fetcher),
        }
    }
}

impl std::fmt::Debug for BoxSecretFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxSecretFetcher")
            .field("provider", &self.inner.provider_name_dyn())
            .finish()
    }
}

impl SecretFetcher for BoxSecretFetcher {
    fn provider_name(&self) -> &'static str {
        self.inner.provider_name_dyn()
    }

    async fn fetch(&self, ctx: &RequestContext) -> Result<String, SecretError> {
        self.inner.fetch_boxed(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl SecretFetcher for Fixed {
        fn provider_name(&self) -> &'static str {
            "fixed"
        }

        async fn fetch(&self, _ctx: &RequestContext) -> Result<String, SecretError> {
            Ok(self.0.to_string())
        }
    }

    #[tokio::test]
    async fn test_boxed_fetcher_delegates() {
        let fetcher = BoxSecretFetcher::new(Fixed("s3cret"));
        assert_eq!(fetcher.provider_name(), "fixed");
        assert_eq!(fetcher.fetch(&RequestContext::new()).await.unwrap(), "s3cret");
        assert!(format!("{fetcher:?}").contains("fixed"));
    }
}
