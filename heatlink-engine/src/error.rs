use heatlink_core::ErrorKind;
use heatlink_http::HttpClientError;
use heatlink_proxy::ProxyError;
use heatlink_registry::{AdapterError, RegistryError};
use heatlink_stats::StatsSinkError;
use thiserror::Error;

use crate::emitter::EmitError;

/// Top-level error returned by [`crate::Engine`] operations (§11),
/// composing every crate boundary's own error type via `#[from]`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no adapter registered for source")]
    UnknownSource,
    #[error("single-flight waiter exceeded its deadline")]
    InFlightTimeout,
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
    #[error(transparent)]
    Http(#[from] HttpClientError),
    #[error(transparent)]
    Stats(#[from] StatsSinkError),
    #[error(transparent)]
    Emit(#[from] EmitError),
    #[error("operation was canceled")]
    Canceled,
    #[error("effective deadline elapsed")]
    Timeout,
    /// Reconstructed from a [`crate::engine::FetchOutcome`] that crossed a
    /// single-flight boundary — the original (non-`Clone`) error type
    /// doesn't survive being shared with followers, so the classification
    /// and message are carried instead.
    #[error("{1}")]
    Classified(ErrorKind, String),
}

impl EngineError {
    /// Maps to the stable, serializable taxonomy returned in `meta` and
    /// recorded in `StatsOutcome` (§7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::UnknownSource => ErrorKind::UnknownSource,
            EngineError::InFlightTimeout => ErrorKind::InFlightTimeout,
            EngineError::Registry(_) => ErrorKind::UnknownSource,
            EngineError::Adapter(err) => err.kind(),
            EngineError::Proxy(err) => err.kind(),
            EngineError::Http(err) => err.kind(),
            EngineError::Stats(_) => ErrorKind::AdapterInternal,
            EngineError::Emit(_) => ErrorKind::AdapterInternal,
            EngineError::Canceled => ErrorKind::Canceled,
            EngineError::Timeout => ErrorKind::Timeout,
            EngineError::Classified(kind, _) => *kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_source_maps_to_its_own_kind() {
        assert_eq!(EngineError::UnknownSource.kind(), ErrorKind::UnknownSource);
    }

    #[test]
    fn in_flight_timeout_maps_to_its_own_kind() {
        assert_eq!(EngineError::InFlightTimeout.kind(), ErrorKind::InFlightTimeout);
    }
}
