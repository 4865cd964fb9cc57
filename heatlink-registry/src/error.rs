use heatlink_core::{CanonicalSourceId, ErrorKind, SourceKind};
use thiserror::Error;

/// Error an [`crate::Adapter`] implementation returns from `fetch` (§7).
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    /// A connect/transport-class failure an adapter observed without going
    /// through `reqwest` directly (e.g. a custom transport, or a test
    /// double simulating a dropped connection). Classified identically to
    /// [`AdapterError::Network`].
    #[error("network error: {0}")]
    Connect(String),
    #[error("could not parse response: {0}")]
    Parse(String),
    #[error("adapter internal error: {0}")]
    Internal(String),
    #[error("rate limited")]
    RateLimited,
    #[error("deadline elapsed")]
    Timeout,
    #[error("canceled")]
    Canceled,
}

impl AdapterError {
    /// Maps to the engine-visible `error_kind` taxonomy (§7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdapterError::Network(_) => ErrorKind::Network,
            AdapterError::Connect(_) => ErrorKind::Network,
            AdapterError::Parse(_) => ErrorKind::Parse,
            AdapterError::Internal(_) => ErrorKind::AdapterInternal,
            AdapterError::RateLimited => ErrorKind::RateLimited,
            AdapterError::Timeout => ErrorKind::Timeout,
            AdapterError::Canceled => ErrorKind::Canceled,
        }
    }

    /// Truncate the display message to the 512-byte bound §3.5 places on
    /// `StatsOutcome.error_message`.
    pub fn truncated_message(&self) -> String {
        let full = self.to_string();
        if full.len() <= 512 {
            full
        } else {
            full.chars().take(512).collect()
        }
    }
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        if err.status().map(|s| s.as_u16()) == Some(429) {
            AdapterError::RateLimited
        } else if err.is_timeout() {
            AdapterError::Timeout
        } else {
            AdapterError::Network(err)
        }
    }
}

/// Error registering a source or resolving its adapter (§3.6, §7 "fatal
/// conditions").
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("source {0} is already registered")]
    DuplicateSource(CanonicalSourceId),
    #[error("no adapter registered for source {0}")]
    UnknownSource(CanonicalSourceId),
    #[error("no constructor registered for source kind {0:?}")]
    UnsupportedKind(SourceKind),
}
