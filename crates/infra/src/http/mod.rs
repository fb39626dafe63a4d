//! HTTP client and transport adapter

mod client;
mod transport;

pub use client::{HttpClient, HttpClientBuilder};
pub use transport::ReqwestTransport;
