use std::fmt;

/// Stable, serializable classification of a fetch failure (§7).
///
/// `ErrorKind` is deliberately not the `std::error::Error` type any
/// component returns — it is the small `Copy` enum recorded in
/// `StatsOutcome` and surfaced to `GetNews` callers in `meta.error_kind`.
/// Every concrete error type in the engine's crates implements
/// `fn kind(&self) -> ErrorKind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No adapter registered for the canonicalized source id.
    UnknownSource,
    /// A single-flight waiter exceeded its caller deadline.
    InFlightTimeout,
    /// No usable proxy and direct fallback disallowed.
    ProxyUnavailable,
    /// DNS/TCP/TLS/connect/read error, or a non-2xx HTTP status.
    Network,
    /// The adapter could not parse the response body.
    Parse,
    /// The adapter raised an unexpected internal error.
    AdapterInternal,
    /// The adapter observed HTTP 429 or an equivalent rate-limit signal.
    RateLimited,
    /// The operation was canceled externally (shutdown, caller cancel).
    Canceled,
    /// The effective deadline elapsed before completion.
    Timeout,
}

impl ErrorKind {
    /// The lowercase, snake_case wire form used in logs and `StatsOutcome`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownSource => "unknown_source",
            ErrorKind::InFlightTimeout => "in_flight_timeout",
            ErrorKind::ProxyUnavailable => "proxy_unavailable",
            ErrorKind::Network => "network",
            ErrorKind::Parse => "parse",
            ErrorKind::AdapterInternal => "adapter_internal",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Canceled => "canceled",
            ErrorKind::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_form() {
        assert_eq!(ErrorKind::RateLimited.to_string(), "rate_limited");
        assert_eq!(ErrorKind::UnknownSource.as_str(), "unknown_source");
    }
}
