use heatlink_core::ErrorKind;
use thiserror::Error;

/// Errors constructing a per-attempt [`reqwest::Client`] (§4.3).
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("failed to build http client: {0}")]
    Build(#[source] reqwest::Error),
    #[error("invalid proxy url: {0}")]
    InvalidProxy(#[source] reqwest::Error),
}

impl HttpClientError {
    /// Maps to the engine-visible `error_kind` taxonomy (§7). Client
    /// construction failures are always surfaced as `network` — they mean
    /// the attempt never got far enough to reach the adapter.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Network
    }
}
