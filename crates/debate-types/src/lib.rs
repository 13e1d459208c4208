//! Shared domain types for the debate conversation store.
//!
//! Conversations, messages, summaries, configuration, and the error
//! taxonomy used across the workspace.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod conversation;
pub mod error;
