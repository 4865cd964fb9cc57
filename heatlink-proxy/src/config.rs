use heatlink_support::Monotonic;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Transport protocol a proxy speaks (§3.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Socks5,
    Http,
    Https,
}

/// Optional proxy-auth credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyCredentials {
    pub username: String,
    pub password: String,
}

/// Health state of a proxy (§4.2).
///
/// `unknown → healthy ↔ degraded ↔ dead`, with `dead` eventually decaying
/// back to `unknown` after a cooldown so the sweep re-probes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyStatus {
    /// Has not yet been probed, or has decayed out of `Dead`.
    Healthy = 0,
    Degraded = 1,
    Unknown = 2,
    Dead = 3,
}

/// Static + live configuration for one proxy (§3.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub proxy_id: SmolStr,
    pub protocol: Protocol,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub credentials: Option<ProxyCredentials>,
    pub group: String,
    #[serde(default)]
    pub priority: i32,
    pub health_check_url: String,
    #[serde(default = "unknown_status")]
    pub status: ProxyStatus,
    #[serde(default)]
    pub last_check_at: Option<Monotonic>,
    #[serde(default)]
    pub latency_ms_ewma: f64,
    #[serde(default)]
    pub consecutive_failures: u32,
}

fn unknown_status() -> ProxyStatus {
    ProxyStatus::Unknown
}

impl ProxyConfig {
    /// Construct a new proxy entry, starting in `unknown` health.
    pub fn new(
        proxy_id: impl Into<SmolStr>,
        protocol: Protocol,
        host: impl Into<String>,
        port: u16,
        group: impl Into<String>,
        health_check_url: impl Into<String>,
    ) -> Self {
        Self {
            proxy_id: proxy_id.into(),
            protocol,
            host: host.into(),
            port,
            credentials: None,
            group: group.into(),
            priority: 0,
            health_check_url: health_check_url.into(),
            status: ProxyStatus::Unknown,
            last_check_at: None,
            latency_ms_ewma: 0.0,
            consecutive_failures: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(ProxyCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// The URL scheme+authority reqwest expects for `Proxy::all`-style
    /// construction, e.g. `socks5://host:port`.
    pub fn proxy_url(&self) -> String {
        let scheme = match self.protocol {
            Protocol::Socks5 => "socks5",
            Protocol::Http => "http",
            Protocol::Https => "https",
        };
        format!("{scheme}://{}:{}", self.host, self.port)
    }

    /// Sort key implementing the §3.4 ordering invariant: `status` first
    /// (healthy before degraded before unknown before dead), then higher
    /// `priority`, then lower `latency_ms_ewma`, then `proxy_id`.
    pub(crate) fn sort_key(&self) -> (ProxyStatus, i32, u64, &str) {
        (
            self.status,
            -self.priority,
            (self.latency_ms_ewma.max(0.0) * 1000.0) as u64,
            self.proxy_id.as_str(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ordering_matches_spec() {
        assert!(ProxyStatus::Healthy < ProxyStatus::Degraded);
        assert!(ProxyStatus::Degraded < ProxyStatus::Unknown);
        assert!(ProxyStatus::Unknown < ProxyStatus::Dead);
    }

    #[test]
    fn sort_key_prefers_higher_priority_within_equal_status() {
        let p1 = ProxyConfig::new("p1", Protocol::Http, "h", 1, "g", "https://h/health").with_priority(10);
        let p2 = ProxyConfig::new("p2", Protocol::Http, "h", 1, "g", "https://h/health").with_priority(5);
        assert!(p1.sort_key() < p2.sort_key());
    }
}
