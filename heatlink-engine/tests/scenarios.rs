//! End-to-end scenarios wiring a real [`Engine`] against the scriptable
//! doubles in `heatlink-test`. S3 (shrink protection), S5 (adaptive
//! backoff) and S6 (proxy failover) are exercised closer to the seam that
//! owns them (`heatlink-cache`'s protection table, `heatlink-scheduler`'s
//! backoff unit tests, and `heatlink-proxy`'s `failover_scenario_s6`);
//! these cover single-flight coalescing, cache-hit short-circuiting and
//! failure-with-warm-cache at the engine's public surface.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use heatlink_cache::CacheLayer;
use heatlink_core::{CallType, CanonicalSourceId, NewsItem};
use heatlink_engine::{DownstreamEmitter, EmitError, Engine, EngineConfig, GetNewsOptions};
use heatlink_proxy::ProxyPool;
use heatlink_registry::{AdapterFactory, Registry};
use heatlink_stats::StatsCollector;
use heatlink_support::{Clock, SystemClock};
use heatlink_test::{RecordingEmitter, RecordingStatsSink, Scripted, ScriptedAdapter};

/// Wraps `heatlink-test`'s plain `RecordingEmitter` in the one-line
/// `DownstreamEmitter` impl its own doc comment describes, avoiding a
/// dependency cycle between `heatlink-test` and `heatlink-engine`.
struct RecordingEmitterAdapter(Arc<RecordingEmitter>);

#[async_trait]
impl DownstreamEmitter for RecordingEmitterAdapter {
    async fn emit(&self, source_id: &CanonicalSourceId, items: &[NewsItem], call_type: CallType) -> Result<(), EmitError> {
        self.0.record(source_id, items, call_type);
        Ok(())
    }
}

struct Harness {
    engine: Arc<Engine>,
    stats: Arc<RecordingStatsSink>,
    emitter: Arc<RecordingEmitter>,
}

fn build(registry: Arc<Registry>) -> Harness {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
    let stats = Arc::new(RecordingStatsSink::new());
    let emitter = Arc::new(RecordingEmitter::new());
    let engine = Engine::new(
        registry,
        AdapterFactory::new(),
        Arc::new(CacheLayer::new(clock.clone())),
        Arc::new(ProxyPool::new(clock.clone())),
        Arc::new(StatsCollector::new(stats.clone(), clock.clone())),
        Arc::new(RecordingEmitterAdapter(Arc::clone(&emitter))),
        clock,
        EngineConfig::default(),
    );
    Harness { engine, stats, emitter }
}

/// S1: ten concurrent `GetNews("demo")` calls against an adapter that
/// sleeps before answering collapse into exactly one `fetch`, and every
/// caller sees the same items.
#[tokio::test]
async fn s1_single_flight_coalesces_concurrent_callers() {
    let registry = Arc::new(Registry::new(heatlink_registry::AliasTable::new()));
    let adapter = Arc::new(ScriptedAdapter::returning("demo", 60_000, 30_000, Vec::new()));
    // Override the zero-delay default step with a slow one so all ten
    // callers are in flight together before the leader finishes.
    adapter.push(Duration::from_millis(150), Scripted::Items(vec![
        NewsItem::builder(CanonicalSourceId::canonicalize("demo"), "demo", "A", "https://example.test/demo/a").build(),
        NewsItem::builder(CanonicalSourceId::canonicalize("demo"), "demo", "B", "https://example.test/demo/b").build(),
        NewsItem::builder(CanonicalSourceId::canonicalize("demo"), "demo", "C", "https://example.test/demo/c").build(),
    ]));
    registry.register(adapter.clone()).unwrap();

    let harness = build(registry);
    let engine = harness.engine;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine.get_news("demo", GetNewsOptions::default()).await.unwrap()
        }));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    assert_eq!(adapter.call_count(), 1, "single-flight should dispatch exactly one fetch");
    for (items, _meta) in &results {
        let titles: Vec<&str> = items.iter().map(|item| item.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
    }
}

/// S2: a second `GetNews` within `cache_ttl_ms` is answered from cache
/// without invoking the adapter again.
#[tokio::test]
async fn s2_cache_hit_skips_the_adapter() {
    let registry = Arc::new(Registry::new(heatlink_registry::AliasTable::new()));
    let adapter = Arc::new(ScriptedAdapter::returning("demo", 60_000, 30_000, vec!["A".into()]));
    registry.register(adapter.clone()).unwrap();

    let harness = build(registry);
    let engine = harness.engine;

    let (first_items, first_meta) = engine.get_news("demo", GetNewsOptions::default()).await.unwrap();
    assert!(!first_meta.cache_hit);
    assert_eq!(first_items.len(), 1);

    let (second_items, second_meta) = engine.get_news("demo", GetNewsOptions::default()).await.unwrap();
    assert!(second_meta.cache_hit);
    assert_eq!(second_items.len(), 1);
    assert_eq!(adapter.call_count(), 1, "a cache hit must not re-invoke the adapter");
}

/// S4: a failure over a warm cache keeps serving the last-known-good
/// items, flags `error_protection_count`, and still records the failed
/// outcome in stats with `error_kind = network`.
#[tokio::test]
async fn s4_failure_over_warm_cache_serves_stale_items_and_protects() {
    let registry = Arc::new(Registry::new(heatlink_registry::AliasTable::new()));
    let adapter = Arc::new(ScriptedAdapter::returning(
        "demo",
        60_000,
        30_000,
        vec!["A".into(), "B".into(), "C".into(), "D".into(), "E".into(), "F".into()],
    ));
    registry.register(adapter.clone()).unwrap();

    let harness = build(registry);
    let engine = harness.engine;

    let (warm_items, _) = engine.get_news("demo", GetNewsOptions::default()).await.unwrap();
    assert_eq!(warm_items.len(), 6);

    adapter.push(Duration::ZERO, Scripted::NetworkError);
    let (items, meta) = engine
        .get_news(
            "demo",
            GetNewsOptions {
                force_refresh: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(items.len(), 6, "the pre-failure items must still be served");
    assert!(meta.protection_applied);
    assert_eq!(meta.error_kind, Some(heatlink_core::ErrorKind::Network));

    let cache_status = engine.cache().status(&CanonicalSourceId::canonicalize("demo")).unwrap();
    assert_eq!(cache_status.protection_counters.error_protection_count, 1);

    let recorded = harness.stats.outcomes();
    let failed = recorded.iter().find(|o| !o.success).expect("a failed outcome was recorded");
    assert_eq!(failed.error_kind, Some(heatlink_core::ErrorKind::Network));
    assert!(failed.cache_used);

    // The downstream emitter never saw the stale re-serve: emission only
    // happens for freshly-committed items (§9), and protection kept the
    // old ones in place.
    assert_eq!(harness.emitter.call_count(), 1);
}

/// An unknown source is rejected before touching the registry's adapter
/// map at all.
#[tokio::test]
async fn unknown_source_is_rejected() {
    let registry = Arc::new(Registry::new(heatlink_registry::AliasTable::new()));
    let harness = build(registry);
    let err = harness.engine.get_news("ghost", GetNewsOptions::default()).await.unwrap_err();
    assert!(matches!(err, heatlink_engine::EngineError::UnknownSource));
}
