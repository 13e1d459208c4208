//! Secret sources for the API-key credential cache.
//!
//! - `env`: reads the key from an environment variable
//! - [`KeychainSecretFetcher`](crate::keychain::KeychainSecretFetcher): reads
//!   it from the OS keychain
//!
//! [`build_secret_fetcher`] picks one according to `[auth]` configuration.

pub mod env;

use debate_core::repository::secret::BoxSecretFetcher;
use debate_types::config::{AuthConfig, SecretSource};

use crate::keychain::KeychainSecretFetcher;
use env::EnvSecretFetcher;

/// Build the configured secret source behind a type-erased handle.
pub fn build_secret_fetcher(config: &AuthConfig) -> BoxSecretFetcher {
    match config.source {
        SecretSource::Env => BoxSecretFetcher::new(EnvSecretFetcher::new(&config.secret_name)),
        SecretSource::Keychain => BoxSecretFetcher::new(KeychainSecretFetcher::new(
            &config.keychain_service,
            &config.secret_name,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debate_core::repository::secret::SecretFetcher;

    #[test]
    fn test_build_secret_fetcher_follows_source() {
        let mut config = AuthConfig::default();
        assert_eq!(build_secret_fetcher(&config).provider_name(), "env");

        config.source = SecretSource::Keychain;
        assert_eq!(build_secret_fetcher(&config).provider_name(), "keychain");
    }
}
