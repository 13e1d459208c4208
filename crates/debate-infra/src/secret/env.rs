//! Environment variable secret source.
//!
//! Reads the variable on every fetch; the credential cache decides how often
//! that happens. Unset, empty and non-Unicode values all count as missing.

use debate_core::context::RequestContext;
use debate_core::repository::secret::SecretFetcher;
use debate_types::error::SecretError;

/// Reads one secret from the process environment.
#[derive(Debug, Clone)]
pub struct EnvSecretFetcher {
    var_name: String,
}

impl EnvSecretFetcher {
    pub fn new(var_name: impl Into<String>) -> Self {
        Self {
            var_name: var_name.into(),
        }
    }
}

impl SecretFetcher for EnvSecretFetcher {
    fn provider_name(&self) -> &'static str {
        "env"
    }

    async fn fetch(&self, ctx: &RequestContext) -> Result<String, SecretError> {
        ctx.check()?;

        match std::env::var(&self.var_name) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            Ok(_) | Err(std::env::VarError::NotPresent) => {
                tracing::debug!(var = %self.var_name, "secret environment variable not set");
                Err(SecretError::NotFound)
            }
            Err(std::env::VarError::NotUnicode(_)) => {
                tracing::warn!(var = %self.var_name, "secret environment variable is not valid Unicode");
                Err(SecretError::NotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_variable() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("DEBATE_TEST_SECRET_READ", "k-42") };

        let fetcher = EnvSecretFetcher::new("DEBATE_TEST_SECRET_READ");
        let value = fetcher.fetch(&RequestContext::new()).await.unwrap();
        assert_eq!(value, "k-42");

        // SAFETY: the variable was set above by this test only.
        unsafe { std::env::remove_var("DEBATE_TEST_SECRET_READ") };
    }

    #[tokio::test]
    async fn test_missing_or_blank_is_not_found() {
        let fetcher = EnvSecretFetcher::new("DEBATE_TEST_SECRET_NEVER_SET");
        let err = fetcher.fetch(&RequestContext::new()).await.unwrap_err();
        assert_eq!(err, SecretError::NotFound);

        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("DEBATE_TEST_SECRET_BLANK", "   ") };
        let fetcher = EnvSecretFetcher::new("DEBATE_TEST_SECRET_BLANK");
        assert_eq!(
            fetcher.fetch(&RequestContext::new()).await.unwrap_err(),
            SecretError::NotFound
        );
        // SAFETY: the variable was set above by this test only.
        unsafe { std::env::remove_var("DEBATE_TEST_SECRET_BLANK") };
    }

    #[tokio::test]
    async fn test_cancelled_context() {
        let ctx = RequestContext::new();
        ctx.cancel();
        let fetcher = EnvSecretFetcher::new("PATH");
        assert_eq!(fetcher.fetch(&ctx).await.unwrap_err(), SecretError::Cancelled);
    }
}
