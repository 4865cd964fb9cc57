use std::sync::Arc;

use heatlink_cache::CacheStatusSnapshot;
use heatlink_core::{CanonicalSourceId, SourceDescriptor};
use heatlink_proxy::ProxyConfig;
use heatlink_registry::RegistryError;
use heatlink_stats::AggregateSnapshot;

use crate::engine::{Engine, FetchMeta, GetNewsOptions};
use crate::error::EngineError;

/// Read-side view of a registered source, combining its static descriptor
/// with whatever live cache/stats state exists for it (§6.5).
#[derive(Debug, Clone)]
pub struct SourceDetail {
    pub descriptor: SourceDescriptor,
    pub cache: Option<CacheStatusSnapshot>,
    pub stats: Option<Arc<AggregateSnapshot>>,
}

/// Read-side view of one configured proxy (§6.5). A thin wrapper today,
/// kept distinct from [`ProxyConfig`] so a transport layer built on top of
/// [`ControlPlane`] has a stable response shape to serialize even if the
/// underlying pool's config grows fields it shouldn't expose verbatim.
#[derive(Debug, Clone)]
pub struct ProxyDetail {
    pub config: ProxyConfig,
}

/// Typed internal API surface for the read/write operations named in §6.5.
/// Serialization and transport (HTTP, gRPC, a CLI) are a caller's concern;
/// this type only owns the operations themselves, each delegating to the
/// already-constructed [`Engine`], registry, proxy pool and stats
/// collector it wraps.
pub struct ControlPlane {
    engine: Arc<Engine>,
}

impl ControlPlane {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// List every currently-registered canonical source id.
    pub fn list_sources(&self) -> Vec<CanonicalSourceId> {
        self.engine.registry().list()
    }

    /// Combined descriptor + cache + stats view for one source.
    pub fn source_detail(&self, source_id: &str) -> Option<SourceDetail> {
        let adapter = self.engine.registry().get(source_id)?;
        let descriptor = adapter.metadata().clone();
        let canonical = descriptor.source_id().clone();
        let cache = self.engine.cache().status(&canonical);
        let stats = self.engine.stats().aggregate_snapshot(&canonical);
        Some(SourceDetail { descriptor, cache, stats })
    }

    /// Registers a newly constructed adapter (§6.5 "register source").
    pub fn register_source(&self, adapter: Arc<dyn heatlink_registry::Adapter>) -> Result<(), RegistryError> {
        self.engine.registry().register(adapter)
    }

    /// Removes a source's adapter from the registry (§6.5 "deregister
    /// source"). Does not cancel a fetch already in flight for it.
    pub fn deregister_source(&self, source_id: &str) -> bool {
        self.engine.registry().deregister(source_id)
    }

    /// Replaces a source's adapter with one built from `descriptor`
    /// (§6.5 "update source config"). The change is visible starting with
    /// the next fetch — nothing in flight is interrupted, and the cache
    /// entry (and its protection counters) survive the swap untouched.
    pub fn update_source_config(&self, descriptor: SourceDescriptor) -> Result<(), RegistryError> {
        let source_id = descriptor.source_id().as_str().to_string();
        let adapter = self.engine.adapter_factory.instantiate(descriptor)?;
        self.engine.registry().deregister(&source_id);
        self.engine.registry().register(adapter)
    }

    /// Every configured proxy (§6.5 "proxy list").
    pub fn list_proxies(&self) -> Vec<ProxyDetail> {
        self.engine
            .proxy_pool()
            .list()
            .into_iter()
            .map(|config| ProxyDetail { config })
            .collect()
    }

    /// One proxy's current config/health (§6.5 "proxy stats").
    pub fn proxy_detail(&self, proxy_id: &str) -> Option<ProxyDetail> {
        self.engine.proxy_pool().get(proxy_id).map(|config| ProxyDetail { config })
    }

    /// Adds or replaces a proxy in the pool (§6.5 "update proxy list").
    pub fn upsert_proxy(&self, proxy: ProxyConfig) {
        self.engine.proxy_pool().upsert(proxy);
    }

    /// Removes a proxy from the pool.
    pub fn remove_proxy(&self, proxy_id: &str) {
        self.engine.proxy_pool().remove(proxy_id);
    }

    /// On-demand `GetNews(source_id, force_refresh=true)` (§6.5 "trigger
    /// on-demand fetch"). Routed through the normal external call path, so
    /// it still respects single-flight coalescing and protection.
    pub async fn trigger_fetch(&self, source_id: &str) -> Result<(Vec<heatlink_core::NewsItem>, FetchMeta), EngineError> {
        self.engine
            .get_news(
                source_id,
                GetNewsOptions {
                    force_refresh: true,
                    ..Default::default()
                },
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatlink_cache::CacheLayer;
    use heatlink_proxy::{Protocol, ProxyPool};
    use heatlink_registry::{AdapterFactory, Registry};
    use heatlink_stats::StatsCollector;
    use heatlink_support::SystemClock;
    use heatlink_test::{RecordingStatsSink, ScriptedAdapter};

    fn control_plane() -> (ControlPlane, Arc<Registry>) {
        let registry = Arc::new(Registry::new(heatlink_registry::AliasTable::new()));
        let clock: Arc<dyn heatlink_support::Clock> = Arc::new(SystemClock::new());
        let engine = Engine::new(
            Arc::clone(&registry),
            AdapterFactory::new(),
            Arc::new(CacheLayer::new(clock.clone())),
            Arc::new(ProxyPool::new(clock.clone())),
            Arc::new(StatsCollector::new(Arc::new(RecordingStatsSink::new()), clock.clone())),
            Arc::new(crate::emitter::NullEmitter),
            clock,
            crate::config::EngineConfig::default(),
        );
        (ControlPlane::new(engine), registry)
    }

    #[test]
    fn register_and_list_sources() {
        let (control, _registry) = control_plane();
        control
            .register_source(Arc::new(ScriptedAdapter::returning("demo", 60_000, 30_000, vec!["A".into()])))
            .unwrap();
        let sources = control.list_sources();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].as_str(), "demo");
    }

    #[test]
    fn deregister_removes_source() {
        let (control, _registry) = control_plane();
        control
            .register_source(Arc::new(ScriptedAdapter::returning("demo", 60_000, 30_000, vec!["A".into()])))
            .unwrap();
        assert!(control.deregister_source("demo"));
        assert!(control.list_sources().is_empty());
    }

    #[test]
    fn source_detail_reports_none_for_unregistered() {
        let (control, _registry) = control_plane();
        assert!(control.source_detail("ghost").is_none());
    }

    #[test]
    fn proxy_roundtrips_through_upsert_and_remove() {
        let (control, _registry) = control_plane();
        control.upsert_proxy(ProxyConfig::new("p1", Protocol::Http, "proxy.test", 8080, "default", "https://proxy.test/health"));
        assert_eq!(control.list_proxies().len(), 1);
        control.remove_proxy("p1");
        assert!(control.list_proxies().is_empty());
    }
}
