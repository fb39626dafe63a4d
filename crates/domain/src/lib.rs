//! # Belay Domain
//!
//! Business domain types and models for Belay.
//!
//! This crate contains:
//! - Token, session, user and reply data types
//! - Transport-neutral HTTP request/response descriptors
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other Belay crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
