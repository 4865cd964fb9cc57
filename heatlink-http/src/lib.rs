//! Per-source HTTP client factory (§4.3).
//!
//! Adapters never open their own sockets (§6.1): the engine hands each
//! fetch attempt a [`reqwest::Client`] built by [`HttpClientFactory`],
//! already carrying the source's proxy, timeouts, redirect cap, user-agent
//! and TLS policy.

mod error;
mod factory;

pub use error::HttpClientError;
pub use factory::{ClientSpec, HttpClientFactory};
