//! Configuration loader for the debate store.
//!
//! Reads `config.toml` from the data directory (`~/.debate/` by default) and
//! deserializes it into [`AppConfig`]. Falls back to defaults when the file
//! is missing or malformed, then applies environment overrides.

use std::path::{Path, PathBuf};

use debate_types::config::{AppConfig, StorageBackend};

/// Environment variable naming the data directory.
pub const DATA_DIR_ENV: &str = "DEBATE_DATA_DIR";

/// Resolve the data directory: `$DEBATE_DATA_DIR`, else `~/.debate`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".debate");
    }

    // Last resort: current directory
    PathBuf::from(".debate")
}

/// Load `{data_dir}/config.toml`, then apply environment overrides.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let mut config = load_config_file(data_dir).await;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

/// Load `{data_dir}/config.toml` without consulting the environment.
///
/// - A missing file yields [`AppConfig::default()`].
/// - An unreadable or unparsable file logs a warning and yields the default.
pub async fn load_config_file(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

/// Apply `DEBATE_STORE`, `REDIS_URL`, `DATABASE_URL`, `DEBATE_AUTH_ENABLED`
/// and `DEBATE_API_KEY_SECRET_NAME` on top of `config`.
///
/// Unparsable values are logged and ignored.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(value) = var("DEBATE_STORE") {
        match value.parse::<StorageBackend>() {
            Ok(backend) => config.storage.backend = backend,
            Err(err) => tracing::warn!("Ignoring DEBATE_STORE: {err}"),
        }
    }

    if let Some(url) = var("REDIS_URL") {
        config.storage.redis_url = Some(url);
    }

    if let Some(url) = var("DATABASE_URL") {
        config.storage.database_url = Some(url);
    }

    if let Some(value) = var("DEBATE_AUTH_ENABLED") {
        match parse_flag(&value) {
            Some(enabled) => config.auth.enabled = enabled,
            None => tracing::warn!("Ignoring DEBATE_AUTH_ENABLED: '{value}' is not a boolean"),
        }
    }

    if let Some(name) = var("DEBATE_API_KEY_SECRET_NAME") {
        config.auth.secret_name = name;
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use debate_types::config::SecretSource;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[tokio::test]
    async fn load_config_file_missing_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(!config.auth.enabled);
    }

    #[tokio::test]
    async fn load_config_file_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
[storage]
backend = "sqlite"
database_url = "sqlite:///tmp/debate-test.db"
fallback_to_memory = false

[auth]
enabled = true
source = "keychain"
"#,
        )
        .await
        .unwrap();

        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(
            config.storage.database_url.as_deref(),
            Some("sqlite:///tmp/debate-test.db")
        );
        assert!(!config.storage.fallback_to_memory);
        assert_eq!(config.storage.redis_key_prefix, "convo:");
        assert!(config.auth.enabled);
        assert_eq!(config.auth.source, SecretSource::Keychain);
        assert_eq!(config.auth.secret_name, "DEBATE_API_KEY");
    }

    #[tokio::test]
    async fn load_config_file_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_config_file(tmp.path()).await;
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[test]
    fn env_overrides_replace_file_values() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("DEBATE_STORE", "Redis"),
                ("REDIS_URL", "redis://cache:6379/0"),
                ("DATABASE_URL", "sqlite:///srv/debate.db"),
                ("DEBATE_AUTH_ENABLED", "yes"),
                ("DEBATE_API_KEY_SECRET_NAME", "DEBATE_PROD_KEY"),
            ]),
        );

        assert_eq!(config.storage.backend, StorageBackend::Redis);
        assert_eq!(config.storage.redis_url.as_deref(), Some("redis://cache:6379/0"));
        assert_eq!(config.storage.database_url.as_deref(), Some("sqlite:///srv/debate.db"));
        assert!(config.auth.enabled);
        assert_eq!(config.auth.secret_name, "DEBATE_PROD_KEY");
    }

    #[test]
    fn invalid_env_overrides_are_ignored() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("DEBATE_STORE", "postgres"),
                ("DEBATE_AUTH_ENABLED", "maybe"),
                ("REDIS_URL", "  "),
            ]),
        );

        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(!config.auth.enabled);
        assert!(config.storage.redis_url.is_none());
    }

    #[test]
    fn parse_flag_values() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("enabled"), None);
    }
}
