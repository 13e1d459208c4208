//! Infrastructure layer for the debate conversation store.
//!
//! Implementations of the ports defined in `debate-core`: the SQLite and
//! Redis conversation stores, environment and OS keychain secret sources,
//! configuration loading, and startup backend selection.

pub mod config;
pub mod keychain;
pub mod redis;
pub mod secret;
pub mod sqlite;
pub mod store;
