use heatlink_core::ErrorKind;
use thiserror::Error;

/// Errors the proxy pool can surface to a fetch attempt.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No usable proxy in the requested group and direct fallback was
    /// disallowed by the source descriptor (§4.2).
    #[error("no usable proxy available and direct fallback is disallowed")]
    Unavailable,
    /// The health-check probe for `proxy_id` failed.
    #[error("health check failed for proxy {proxy_id}: {source}")]
    HealthCheckFailed {
        proxy_id: String,
        #[source]
        source: reqwest::Error,
    },
}

impl ProxyError {
    /// Maps to the engine-visible `error_kind` taxonomy (§7).
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProxyError::Unavailable => ErrorKind::ProxyUnavailable,
            ProxyError::HealthCheckFailed { .. } => ErrorKind::Network,
        }
    }
}
