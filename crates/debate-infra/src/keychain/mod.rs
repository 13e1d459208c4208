//! OS keychain secret source.
//!
//! Uses the `keyring` crate to read the API key from:
//! - macOS Keychain
//! - Linux Secret Service (GNOME Keyring, KDE Wallet)
//! - Windows Credential Manager
//!
//! The platform calls block, so each fetch runs on the blocking thread pool.

use debate_core::context::RequestContext;
use debate_core::repository::secret::SecretFetcher;
use debate_types::error::SecretError;

/// Reads one secret stored under `(service, account)` in the OS keychain.
#[derive(Debug, Clone)]
pub struct KeychainSecretFetcher {
    service_name: String,
    account: String,
}

impl KeychainSecretFetcher {
    pub fn new(service_name: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            account: account.into(),
        }
    }

    /// Store `value` in the keychain under this fetcher's entry.
    ///
    /// Backs `debate set-key`; fetches only ever read.
    pub async fn store(&self, value: &str) -> Result<(), SecretError> {
        let (service, account, value) = (
            self.service_name.clone(),
            self.account.clone(),
            value.to_string(),
        );
        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, &account).map_err(provider_error)?;
            entry.set_password(&value).map_err(provider_error)
        })
        .await
        .map_err(|e| SecretError::ProviderUnavailable(format!("keychain task failed: {e}")))?
    }
}

impl SecretFetcher for KeychainSecretFetcher {
    fn provider_name(&self) -> &'static str {
        "keychain"
    }

    async fn fetch(&self, ctx: &RequestContext) -> Result<String, SecretError> {
        let (service, account) = (self.service_name.clone(), self.account.clone());
        let lookup = tokio::task::spawn_blocking(move || read_entry(&service, &account));

        let value = ctx
            .run(lookup)
            .await?
            .map_err(|e| SecretError::ProviderUnavailable(format!("keychain task failed: {e}")))??;

        if value.trim().is_empty() {
            return Err(SecretError::NotFound);
        }
        Ok(value)
    }
}

fn read_entry(service: &str, account: &str) -> Result<String, SecretError> {
    let entry = keyring::Entry::new(service, account).map_err(provider_error)?;
    match entry.get_password() {
        Ok(value) => Ok(value),
        Err(keyring::Error::NoEntry) => {
            tracing::debug!(service, account, "no keychain entry");
            Err(SecretError::NotFound)
        }
        Err(e) => Err(provider_error(e)),
    }
}

fn provider_error(e: keyring::Error) -> SecretError {
    tracing::warn!(provider = "keychain", error = %e, "keychain access failed");
    SecretError::ProviderUnavailable("keychain access failed".to_string())
}
