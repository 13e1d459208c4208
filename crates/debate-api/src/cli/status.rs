//! Store health command.

use anyhow::Result;
use console::style;

use debate_core::repository::conversation::ConversationStore;

use crate::state::AppState;

/// Probe the active store and report which backend is serving.
///
/// Fails when the probe fails so scripts can rely on the exit status.
pub async fn health(state: &AppState, json: bool) -> Result<()> {
    let store = state.conversations.store();
    let ctx = state.request_context();
    let probe = store.health_check(&ctx).await;

    let configured = state.config.storage.backend.to_string();
    let active = store.backend_name();
    let fell_back = configured != active;

    if json {
        let report = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.data_dir.display().to_string(),
            "configured_backend": configured,
            "active_backend": active,
            "healthy": probe.is_ok(),
            "error": probe.as_ref().err().map(ToString::to_string),
            "auth_enabled": state.config.auth.enabled,
            "key_cache_ttl_secs": state.credentials.ttl().as_secs(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!("  {} debate v{}", style("⚖").bold(), env!("CARGO_PKG_VERSION"));
        println!();
        println!("  {}", style("── Storage ──").dim());
        println!("  Backend:  {}", style(active).cyan());
        if fell_back {
            println!(
                "  {} configured '{}' was unreachable at startup",
                style("!").yellow().bold(),
                configured
            );
        }
        match &probe {
            Ok(()) => println!("  Status:   {}", style("healthy").green()),
            Err(err) => println!("  Status:   {} ({err})", style("unhealthy").red()),
        }
        println!();
        println!("  {}", style("── Auth ──").dim());
        if state.config.auth.enabled {
            println!(
                "  API key:  {} via {}",
                style("required").yellow(),
                state.config.auth.source
            );
            println!("  Cached:   {}s", state.credentials.ttl().as_secs());
        } else {
            println!("  API key:  {}", style("disabled").dim());
        }
        println!();
        println!("  Data dir: {}", style(state.data_dir.display()).dim());
        println!();
    }

    probe.map_err(|err| anyhow::anyhow!("{active} store is unhealthy: {err}"))
}
