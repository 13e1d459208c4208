//! API-key authentication.
//!
//! Callers present a key in `X-API-Key` or as an `Authorization: Bearer`
//! token. Probe endpoints are exempt. Everything else is checked against the
//! secret held by a [`CredentialCache`](credential_cache::CredentialCache).

pub mod credential_cache;

use debate_types::error::AuthError;

use crate::context::RequestContext;
use crate::repository::secret::SecretFetcher;
use credential_cache::CredentialCache;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

const PUBLIC_PATHS: &[&str] = &["/health", "/ready"];

/// Paths that never require a key.
pub fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

/// Pull the API key out of request headers.
///
/// Header names match case-insensitively. `X-API-Key` wins over
/// `Authorization`. Blank values count as absent.
pub fn extract_api_key<'a, I>(headers: I) -> Result<&'a str, AuthError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut bearer = None;

    for (name, value) in headers {
        let value = value.trim();
        if name.eq_ignore_ascii_case(API_KEY_HEADER) {
            if !value.is_empty() {
                return Ok(value);
            }
        } else if name.eq_ignore_ascii_case("authorization") && bearer.is_none() {
            bearer = value
                .split_once(' ')
                .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
                .map(|(_, token)| token.trim())
                .filter(|token| !token.is_empty());
        }
    }

    bearer.ok_or(AuthError::MissingCredentials)
}

/// Authorize one request: public paths pass, everything else needs a key
/// that matches the cached secret.
pub async fn authorize<'a, F, I>(
    cache: &CredentialCache<F>,
    ctx: &RequestContext,
    path: &str,
    headers: I,
) -> Result<(), AuthError>
where
    F: SecretFetcher,
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    if is_public_path(path) {
        return Ok(());
    }

    let key = extract_api_key(headers)?;
    cache.validate(ctx, key).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use debate_types::error::SecretError;

    struct StaticKey;

    impl SecretFetcher for StaticKey {
        fn provider_name(&self) -> &'static str {
            "static"
        }

        async fn fetch(&self, _ctx: &RequestContext) -> Result<String, SecretError> {
            Ok("k-123".to_string())
        }
    }

    #[test]
    fn test_extract_from_api_key_header_any_case() {
        assert_eq!(extract_api_key([("X-API-Key", "abc")]), Ok("abc"));
        assert_eq!(extract_api_key([("x-api-key", " abc ")]), Ok("abc"));
    }

    #[test]
    fn test_extract_from_bearer_token() {
        assert_eq!(
            extract_api_key([("Authorization", "Bearer tok")]),
            Ok("tok")
        );
        assert_eq!(
            extract_api_key([("authorization", "bearer   tok ")]),
            Ok("tok")
        );
        assert_eq!(
            extract_api_key([("Authorization", "Basic dXNlcg==")]),
            Err(AuthError::MissingCredentials)
        );
    }

    #[test]
    fn test_api_key_header_wins_over_bearer() {
        let headers = [("Authorization", "Bearer tok"), ("X-API-Key", "abc")];
        assert_eq!(extract_api_key(headers), Ok("abc"));
    }

    #[test]
    fn test_missing_or_blank_key() {
        assert_eq!(
            extract_api_key(std::iter::empty()),
            Err(AuthError::MissingCredentials)
        );
        assert_eq!(
            extract_api_key([("X-API-Key", "  "), ("Accept", "*/*")]),
            Err(AuthError::MissingCredentials)
        );
    }

    #[test]
    fn test_public_paths() {
        assert!(is_public_path("/health"));
        assert!(is_public_path("/ready"));
        assert!(!is_public_path("/api/v1/conversations"));
        assert!(!is_public_path("/health/deep"));
    }

    #[tokio::test]
    async fn test_authorize() {
        let cache = CredentialCache::new(StaticKey);
        let ctx = RequestContext::new();

        assert!(authorize(&cache, &ctx, "/health", std::iter::empty()).await.is_ok());
        assert_eq!(
            authorize(&cache, &ctx, "/chat", std::iter::empty()).await,
            Err(AuthError::MissingCredentials)
        );
        assert_eq!(
            authorize(&cache, &ctx, "/chat", [("X-API-Key", "nope")]).await,
            Err(AuthError::InvalidCredentials)
        );
        assert!(authorize(&cache, &ctx, "/chat", [("X-API-Key", "k-123")]).await.is_ok());
        // Public paths skip the key check entirely.
        assert!(authorize(&cache, &ctx, "/ready", [("X-API-Key", "nope")]).await.is_ok());
    }
}
