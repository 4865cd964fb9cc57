use serde::{Deserialize, Serialize};

/// Startup configuration the engine reads once (§6.6, §12).
///
/// Everything else about a source's behavior lives on its
/// [`heatlink_core::SourceDescriptor`] and is read fresh on every fetch —
/// nothing here is consulted per-fetch except as a fallback default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_update_interval_ms: u64,
    pub default_cache_ttl_ms: u64,
    pub default_fetch_deadline_ms: u64,
    /// Global semaphore size for concurrent adapter fetches (§5).
    pub global_fetch_concurrency: usize,
    /// Global semaphore size for headless-renderer use (§5). Renderer
    /// implementation is out of scope; this bounds the resource for
    /// whichever `heatlink_adapters::Renderer` a deployment plugs in.
    pub headless_renderer_pool_size: usize,
    /// Address of a shared-cache backend (Moka doesn't need one; Redis
    /// does). `None` runs with in-memory cache only.
    pub shared_cache_address: Option<String>,
    pub proxy_required_domains: Vec<String>,
    pub default_user_agent: String,
    /// How long `Engine::shutdown` waits for in-flight leaders to finish
    /// before canceling them (§5).
    pub shutdown_grace_ms: u64,
    pub stats_flush_interval_ms: u64,
    /// Bounded wait for the downstream emitter's ack (§6.4).
    pub emit_ack_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_update_interval_ms: 300_000,
            default_cache_ttl_ms: 60_000,
            default_fetch_deadline_ms: 60_000,
            global_fetch_concurrency: 8,
            headless_renderer_pool_size: 2,
            shared_cache_address: None,
            proxy_required_domains: Vec::new(),
            default_user_agent: "heatlink-engine/0.1".to_string(),
            shutdown_grace_ms: 30_000,
            stats_flush_interval_ms: 300_000,
            emit_ack_timeout_ms: 5_000,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document into an `EngineConfig`, filling in defaults
    /// for any field the document omits.
    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let config = EngineConfig::default();
        assert_eq!(config.global_fetch_concurrency, 8);
        assert_eq!(config.headless_renderer_pool_size, 2);
        assert_eq!(config.stats_flush_interval_ms, 300_000);
        assert_eq!(config.shutdown_grace_ms, 30_000);
    }

    #[test]
    fn partial_toml_fills_in_remaining_defaults() {
        let config = EngineConfig::from_toml("global_fetch_concurrency = 16\n").unwrap();
        assert_eq!(config.global_fetch_concurrency, 16);
        assert_eq!(config.default_cache_ttl_ms, 60_000);
    }
}
