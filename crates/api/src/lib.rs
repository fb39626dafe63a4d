//! # Belay App
//!
//! Application layer: composition root and the command surface the UI calls.
//!
//! This crate contains:
//! - Session commands (`login`, `logout`, `is_authenticated`,
//!   `get_valid_token`, `auth_fetch`) and reply commands
//! - Application context (dependency injection)
//! - Logging bootstrap and the `belay` binary
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Wires the stores and transport into the session stack

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
