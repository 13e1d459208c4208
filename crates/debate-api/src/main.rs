//! Debate conversation store CLI entry point.
//!
//! Binary name: `debate`
//!
//! Parses CLI arguments, loads configuration, opens the configured store,
//! then dispatches to the matching command handler.

mod cli;
mod state;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up tracing based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info,debate=debug",
        _ => "trace",
    };

    // RUST_LOG, when set, wins over the flags.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let state = AppState::init().await?;

    match cli.command {
        Commands::Health => {
            cli::status::health(&state, cli.json).await?;
        }

        Commands::Create { topic, stance } => {
            cli::conversation::create_conversation(&state, &topic, stance, cli.json).await?;
        }

        Commands::Show { id } => {
            cli::conversation::show_conversation(&state, &id, cli.json).await?;
        }

        Commands::List { limit, offset } => {
            cli::conversation::list_conversations(&state, limit, offset, cli.json).await?;
        }

        Commands::Topics { limit } => {
            cli::conversation::popular_topics(&state, limit, cli.json).await?;
        }

        Commands::VerifyKey { key, path } => {
            cli::auth::verify_key(&state, &key, &path, cli.json).await?;
        }

        Commands::SetKey { value } => {
            cli::auth::set_key(&state, value.as_deref(), cli.json).await?;
        }
    }

    Ok(())
}
