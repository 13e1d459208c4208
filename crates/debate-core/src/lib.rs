//! Business logic and port definitions for the debate conversation store.
//!
//! This crate defines the traits (ports) that the infrastructure layer
//! implements. It depends only on `debate-types` -- never on `debate-infra`
//! or any database/IO crate. The in-memory backend lives here because it
//! needs nothing beyond tokio.

pub mod auth;
pub mod context;
pub mod repository;
pub mod service;
