//! CLI command definitions for the `debate` binary.
//!
//! Uses clap derive macros for argument parsing. Every command runs against
//! the store selected by configuration.

pub mod auth;
pub mod conversation;
pub mod status;

use clap::{Parser, Subcommand};
use debate_types::conversation::Stance;

/// Inspect and manage debate conversations.
#[derive(Parser)]
#[command(name = "debate", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe the configured conversation store.
    Health,

    /// Start a new, empty conversation.
    Create {
        /// Debate topic.
        #[arg(long)]
        topic: String,

        /// Side the bot argues (PRO or CON).
        #[arg(long, value_parser = parse_stance, default_value = "PRO")]
        stance: Stance,
    },

    /// Show one conversation with its messages.
    Show {
        /// Conversation id.
        id: String,
    },

    /// List conversations, most recent first.
    #[command(alias = "ls")]
    List {
        /// Page size (1-100; anything else uses 20).
        #[arg(long, default_value_t = DEFAULT_LIST_LIMIT as i64, allow_negative_numbers = true)]
        limit: i64,

        /// Number of conversations to skip.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i64,
    },

    /// Most debated topics.
    Topics {
        /// How many topics (1-50; anything else uses 10).
        #[arg(long, default_value_t = DEFAULT_TOPICS_LIMIT as i64, allow_negative_numbers = true)]
        limit: i64,
    },

    /// Check an API key against the configured secret source.
    #[command(name = "verify-key")]
    VerifyKey {
        /// The key to check.
        key: String,

        /// Request path to authorize (probe paths never need a key).
        #[arg(long, default_value = "/chat")]
        path: String,
    },

    /// Store the API key in the OS keychain.
    #[command(name = "set-key")]
    SetKey {
        /// Key value (optional; prompts if omitted).
        #[arg(long)]
        value: Option<String>,
    },
}

pub const DEFAULT_LIST_LIMIT: usize = 20;
pub const MAX_LIST_LIMIT: usize = 100;
pub const DEFAULT_TOPICS_LIMIT: usize = 10;
pub const MAX_TOPICS_LIMIT: usize = 50;

fn parse_stance(s: &str) -> Result<Stance, String> {
    s.parse()
}

/// Out-of-range limits fall back to the default rather than clamping.
pub fn page_limit(requested: i64, default: usize, max: usize) -> usize {
    match usize::try_from(requested) {
        Ok(limit) if (1..=max).contains(&limit) => limit,
        _ => default,
    }
}

pub fn page_offset(requested: i64) -> usize {
    usize::try_from(requested).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_limit_falls_back_to_default() {
        assert_eq!(page_limit(5, 20, 100), 5);
        assert_eq!(page_limit(100, 20, 100), 100);
        assert_eq!(page_limit(0, 20, 100), 20);
        assert_eq!(page_limit(-3, 20, 100), 20);
        assert_eq!(page_limit(101, 20, 100), 20);
        assert_eq!(page_limit(51, 10, 50), 10);
    }

    #[test]
    fn test_page_offset_never_negative() {
        assert_eq!(page_offset(-1), 0);
        assert_eq!(page_offset(40), 40);
    }

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::try_parse_from(["debate", "--json", "create", "--topic", "AI", "--stance", "con"])
            .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Create { topic, stance } => {
                assert_eq!(topic, "AI");
                assert_eq!(stance, Stance::Con);
            }
            _ => panic!("expected create"),
        }

        let cli = Cli::try_parse_from(["debate", "list", "--limit", "-5"]).unwrap();
        assert!(matches!(cli.command, Commands::List { limit: -5, offset: 0 }));

        assert!(Cli::try_parse_from(["debate", "create", "--topic", "AI", "--stance", "maybe"]).is_err());

        let cli = Cli::try_parse_from(["debate", "set-key", "--value", "k-1"]).unwrap();
        assert!(matches!(cli.command, Commands::SetKey { value: Some(ref v) } if v == "k-1"));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        <Cli as clap::CommandFactory>::command().debug_assert();
    }
}
