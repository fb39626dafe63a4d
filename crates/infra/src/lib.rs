//! # Belay Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The reqwest-backed [`HttpTransport`](belay_core::HttpTransport)
//! - Token stores (session file, platform keychain, in-memory)
//! - Configuration loading from the environment and config files
//!
//! ## Architecture
//! - Implements traits defined in `belay-core`
//! - Contains all "impure" code (network, filesystem, keychain)

pub mod config;
pub mod errors;
pub mod http;
pub mod storage;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder, ReqwestTransport};
pub use storage::{build_token_store, FileTokenStore, KeychainTokenStore, MemoryTokenStore};
