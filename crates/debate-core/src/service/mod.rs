//! Services orchestrating store calls into complete workflows.

pub mod conversation;
