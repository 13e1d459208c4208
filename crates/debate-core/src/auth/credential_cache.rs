//! Time-bounded cache in front of a [`SecretFetcher`].
//!
//! The cache is either `Stale` (nothing usable) or `Fresh` (a value plus the
//! instant it stops being usable). The only transition into `Fresh` happens
//! while the write lock is held, after re-checking the state, so concurrent
//! callers hitting a stale cache trigger a single fetch between them.

use std::time::Duration;

use chrono::Utc;
use debate_types::error::{AuthError, SecretError};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::context::RequestContext;
use crate::repository::secret::SecretFetcher;

/// How long a fetched secret stays usable.
pub const DEFAULT_CREDENTIAL_TTL: Duration = Duration::from_secs(30 * 60);

enum CacheState {
    Stale,
    Fresh {
        value: SecretString,
        expires_at: Instant,
    },
}

impl CacheState {
    /// The cached value, if present and not yet expired.
    fn current(&self) -> Option<SecretString> {
        match self {
            CacheState::Fresh { value, expires_at } if Instant::now() < *expires_at => {
                Some(SecretString::from(value.expose_secret().to_owned()))
            }
            _ => None,
        }
    }
}

/// Caches one secret obtained from `F`.
pub struct CredentialCache<F: SecretFetcher> {
    fetcher: F,
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl<F: SecretFetcher> CredentialCache<F> {
    /// Create an empty (stale) cache with the default 30 minute TTL.
    pub fn new(fetcher: F) -> Self {
        Self::with_ttl(fetcher, DEFAULT_CREDENTIAL_TTL)
    }

    pub fn with_ttl(fetcher: F, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            state: RwLock::new(CacheState::Stale),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether a usable value is cached right now.
    pub async fn is_fresh(&self) -> bool {
        self.state.read().await.current().is_some()
    }

    /// Return the cached secret, fetching it first if the cache is stale.
    ///
    /// A failed fetch leaves the cache as it was.
    pub async fn get_secret(&self, ctx: &RequestContext) -> Result<SecretString, SecretError> {
        {
            let state = ctx.run(self.state.read()).await?;
            if let Some(value) = state.current() {
                return Ok(value);
            }
        }

        let mut state = ctx.run(self.state.write()).await?;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(value) = state.current() {
            return Ok(value);
        }
        self.refresh_locked(ctx, &mut state).await
    }

    /// Drop the cached value and fetch a new one.
    ///
    /// If the fetch fails the cache stays stale.
    pub async fn force_refresh(&self, ctx: &RequestContext) -> Result<(), SecretError> {
        let mut state = ctx.run(self.state.write()).await?;
        *state = CacheState::Stale;
        self.refresh_locked(ctx, &mut state).await.map(|_| ())
    }

    /// Check `provided` against the cached secret.
    ///
    /// Any failure to resolve the secret is reported the same way as a
    /// mismatch.
    pub async fn validate(&self, ctx: &RequestContext, provided: &str) -> Result<(), AuthError> {
        let expected = match self.get_secret(ctx).await {
            Ok(expected) => expected,
            Err(e) => {
                tracing::warn!(
                    provider = self.fetcher.provider_name(),
                    error = %e,
                    "could not resolve API key for validation"
                );
                return Err(AuthError::InvalidCredentials);
            }
        };

        if expected.expose_secret() == provided {
            Ok(())
        } else {
            tracing::debug!(request_id = %ctx.request_id, "API key mismatch");
            Err(AuthError::InvalidCredentials)
        }
    }

    async fn refresh_locked(
        &self,
        ctx: &RequestContext,
        state: &mut CacheState,
    ) -> Result<SecretString, SecretError> {
        let value = ctx.run(self.fetcher.fetch(ctx)).await??;
        if value.is_empty() {
            return Err(SecretError::NotFound);
        }

        let expires_at = Instant::now() + self.ttl;
        let expires_wall = chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .map(|at| at.to_rfc3339())
            .unwrap_or_default();
        tracing::info!(
            provider = self.fetcher.provider_name(),
            expires_at = %expires_wall,
            "API key refreshed"
        );

        let fresh = SecretString::from(value.clone());
        *state = CacheState::Fresh {
            value: SecretString::from(value),
            expires_at,
        };
        Ok(fresh)
    }
}

impl<F: SecretFetcher> std::fmt::Debug for CredentialCache<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCache")
            .field("provider", &self.fetcher.provider_name())
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Fetcher returning scripted results and counting calls.
    struct Scripted {
        results: Mutex<Vec<Result<String, SecretError>>>,
        calls: Arc<AtomicUsize>,
        delay: Duration,
    }

    impl Scripted {
        fn new(results: Vec<Result<String, SecretError>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let fetcher = Self {
                results: Mutex::new(results.into_iter().rev().collect()),
                calls: Arc::clone(&calls),
                delay: Duration::ZERO,
            };
            (fetcher, calls)
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    impl SecretFetcher for Scripted {
        fn provider_name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch(&self, _ctx: &RequestContext) -> Result<String, SecretError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(Err(SecretError::ProviderUnavailable("exhausted".into())))
        }
    }

    #[tokio::test]
    async fn test_first_call_fetches_then_caches() {
        let (fetcher, calls) = Scripted::new(vec![Ok("key-1".into())]);
        let cache = CredentialCache::new(fetcher);
        let ctx = RequestContext::new();

        assert!(!cache.is_fresh().await);
        assert_eq!(cache.get_secret(&ctx).await.unwrap().expose_secret(), "key-1");
        assert_eq!(cache.get_secret(&ctx).await.unwrap().expose_secret(), "key-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_fresh().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_refetched() {
        let (fetcher, calls) = Scripted::new(vec![Ok("old".into()), Ok("new".into())]);
        let cache = CredentialCache::new(fetcher);
        let ctx = RequestContext::new();

        assert_eq!(cache.get_secret(&ctx).await.unwrap().expose_secret(), "old");

        tokio::time::advance(Duration::from_secs(29 * 60)).await;
        assert_eq!(cache.get_secret(&ctx).await.unwrap().expose_secret(), "old");

        tokio::time::advance(Duration::from_secs(2 * 60)).await;
        assert!(!cache.is_fresh().await);
        assert_eq!(cache.get_secret(&ctx).await.unwrap().expose_secret(), "new");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fresh_entry_skips_fetch() {
        let (fetcher, calls) = Scripted::new(vec![
            Ok("key-1".into()),
            Err(SecretError::ProviderUnavailable("down".into())),
        ]);
        let cache = CredentialCache::new(fetcher);
        let ctx = RequestContext::new();

        cache.get_secret(&ctx).await.unwrap();
        assert_eq!(cache.get_secret(&ctx).await.unwrap().expose_secret(), "key-1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // The scripted failure was never reached.
        assert_eq!(cache.fetcher.results.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_of_expired_entry_propagates() {
        let (fetcher, _calls) = Scripted::new(vec![
            Ok("key-1".into()),
            Err(SecretError::ProviderUnavailable("down".into())),
            Ok("key-2".into()),
        ]);
        let cache = CredentialCache::with_ttl(fetcher, Duration::from_secs(60));
        let ctx = RequestContext::new();

        cache.get_secret(&ctx).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;

        let err = cache.get_secret(&ctx).await.unwrap_err();
        assert_eq!(err, SecretError::ProviderUnavailable("down".into()));
        assert_eq!(cache.get_secret(&ctx).await.unwrap().expose_secret(), "key-2");
    }

    #[tokio::test]
    async fn test_empty_secret_is_not_found() {
        let (fetcher, _calls) = Scripted::new(vec![Ok(String::new())]);
        let cache = CredentialCache::new(fetcher);

        let err = cache.get_secret(&RequestContext::new()).await.unwrap_err();
        assert_eq!(err, SecretError::NotFound);
        assert!(!cache.is_fresh().await);
    }

    #[tokio::test]
    async fn test_force_refresh_replaces_value() {
        let (fetcher, calls) = Scripted::new(vec![Ok("key-1".into()), Ok("key-2".into())]);
        let cache = CredentialCache::new(fetcher);
        let ctx = RequestContext::new();

        cache.get_secret(&ctx).await.unwrap();
        cache.force_refresh(&ctx).await.unwrap();
        assert_eq!(cache.get_secret(&ctx).await.unwrap().expose_secret(), "key-2");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_force_refresh_leaves_cache_stale() {
        let (fetcher, _calls) = Scripted::new(vec![
            Ok("key-1".into()),
            Err(SecretError::NotFound),
        ]);
        let cache = CredentialCache::new(fetcher);
        let ctx = RequestContext::new();

        cache.get_secret(&ctx).await.unwrap();
        assert_eq!(cache.force_refresh(&ctx).await.unwrap_err(), SecretError::NotFound);
        assert!(!cache.is_fresh().await);
    }

    #[tokio::test]
    async fn test_validate_outcomes() {
        let (fetcher, _calls) = Scripted::new(vec![Ok("right".into())]);
        let cache = CredentialCache::new(fetcher);
        let ctx = RequestContext::new();

        assert!(cache.validate(&ctx, "right").await.is_ok());
        assert_eq!(
            cache.validate(&ctx, "wrong").await.unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[tokio::test]
    async fn test_validate_with_unreachable_source_is_invalid() {
        let (fetcher, _calls) = Scripted::new(vec![Err(SecretError::ProviderUnavailable(
            "keychain locked".into(),
        ))]);
        let cache = CredentialCache::new(fetcher);

        let err = cache
            .validate(&RequestContext::new(), "anything")
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_abandoned_at_deadline() {
        let (fetcher, _calls) = Scripted::new(vec![Ok("slow".into())]);
        let cache = CredentialCache::new(fetcher.with_delay(Duration::from_secs(5)));
        let ctx = RequestContext::with_timeout(Duration::from_millis(100));

        let err = cache.get_secret(&ctx).await.unwrap_err();
        assert_eq!(err, SecretError::DeadlineExceeded);
        assert!(!cache.is_fresh().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_stale_callers_fetch_once() {
        let (fetcher, calls) = Scripted::new(vec![Ok("shared".into())]);
        let cache = Arc::new(CredentialCache::new(
            fetcher.with_delay(Duration::from_millis(50)),
        ));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let ctx = RequestContext::new();
                cache.get_secret(&ctx).await.map(|s| s.expose_secret().to_owned())
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "shared");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
