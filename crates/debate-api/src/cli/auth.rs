//! API key commands: provision and verify.

use anyhow::{Context, Result};
use console::style;
use dialoguer::Password;

use debate_core::auth::{authorize, API_KEY_HEADER};
use debate_infra::keychain::KeychainSecretFetcher;
use debate_types::config::SecretSource;

use crate::state::AppState;

/// Check `key` the way a request to `path` would be checked.
///
/// With authentication disabled every key is accepted. A rejected key exits
/// with an error carrying the rejection code.
pub async fn verify_key(state: &AppState, key: &str, path: &str, json: bool) -> Result<()> {
    let outcome = if state.config.auth.enabled {
        let ctx = state.request_context();
        authorize(state.credentials.as_ref(), &ctx, path, [(API_KEY_HEADER, key)]).await
    } else {
        Ok(())
    };

    if json {
        let report = serde_json::json!({
            "path": path,
            "auth_enabled": state.config.auth.enabled,
            "authorized": outcome.is_ok(),
            "code": outcome.as_ref().err().map(|e| e.code()),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match &outcome {
            Ok(()) if !state.config.auth.enabled => {
                println!("  {} Authentication is disabled; all keys accepted", style("!").yellow().bold());
            }
            Ok(()) => println!("  {} Key accepted for {}", style("✓").green().bold(), path),
            Err(err) => println!("  {} {} ({})", style("✗").red().bold(), err, err.code()),
        }
    }

    outcome.map_err(|err| anyhow::anyhow!("{}: {err}", err.code()))
}

/// Store the API key in the OS keychain entry named by `[auth]`.
///
/// Prompts with hidden input when `value` is omitted.
pub async fn set_key(state: &AppState, value: Option<&str>, json: bool) -> Result<()> {
    let auth = &state.config.auth;
    let value = match value {
        Some(v) => v.to_string(),
        None => Password::new()
            .with_prompt(format!("Enter API key for {}", style(&auth.secret_name).bold()))
            .interact()?,
    };
    anyhow::ensure!(!value.trim().is_empty(), "API key must not be empty");

    KeychainSecretFetcher::new(&auth.keychain_service, &auth.secret_name)
        .store(&value)
        .await
        .context("Failed to store API key in the OS keychain")?;

    if json {
        let report = serde_json::json!({
            "set": true,
            "service": auth.keychain_service,
            "account": auth.secret_name,
            "masked": mask_key(&value),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "  {} API key stored in keychain entry '{}/{}' ({})",
        style("✓").green().bold(),
        auth.keychain_service,
        style(&auth.secret_name).bold(),
        mask_key(&value)
    );
    if auth.source != SecretSource::Keychain {
        println!(
            "  {} [auth] source is '{}'; set source = \"keychain\" to use it",
            style("!").yellow().bold(),
            auth.source
        );
    }

    Ok(())
}

/// Show the last four characters only.
fn mask_key(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_key_hides_all_but_tail() {
        assert_eq!(mask_key("sk-live-1234567890"), "****7890");
        assert_eq!(mask_key("short"), "****");
        assert_eq!(mask_key("ключ-секрет-42"), "****т-42");
    }
}
