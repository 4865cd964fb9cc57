use std::sync::Arc;

use async_trait::async_trait;
use heatlink_core::{CallType, CanonicalSourceId};
use heatlink_scheduler::{DispatchOutcome, Dispatcher};

use crate::engine::Engine;

/// Adapts [`Engine::fetch_source`] to the scheduler's [`Dispatcher`] seam
/// (§4.8), so `heatlink-scheduler` never needs to know about the registry,
/// cache or single-flight guard it is driving.
pub struct EngineDispatcher {
    engine: Arc<Engine>,
}

impl EngineDispatcher {
    pub fn new(engine: Arc<Engine>) -> Arc<Self> {
        Arc::new(Self { engine })
    }
}

#[async_trait]
impl Dispatcher for EngineDispatcher {
    async fn dispatch(&self, source_id: CanonicalSourceId) -> DispatchOutcome {
        self.engine.fetch_source(&source_id, CallType::Internal).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatlink_cache::CacheLayer;
    use heatlink_proxy::ProxyPool;
    use heatlink_registry::{AdapterFactory, Registry};
    use heatlink_stats::StatsCollector;
    use heatlink_support::SystemClock;
    use heatlink_test::{RecordingStatsSink, ScriptedAdapter};

    fn build_engine(registry: Arc<Registry>) -> Arc<Engine> {
        let clock: Arc<dyn heatlink_support::Clock> = Arc::new(SystemClock::new());
        Engine::new(
            registry,
            AdapterFactory::new(),
            Arc::new(CacheLayer::new(clock.clone())),
            Arc::new(ProxyPool::new(clock.clone())),
            Arc::new(StatsCollector::new(Arc::new(RecordingStatsSink::new()), clock.clone())),
            Arc::new(crate::emitter::NullEmitter),
            clock,
            crate::config::EngineConfig::default(),
        )
    }

    #[tokio::test]
    async fn unknown_source_is_skipped_without_panicking() {
        let registry = Arc::new(Registry::new(heatlink_registry::AliasTable::new()));
        let engine = build_engine(registry);
        let dispatcher = EngineDispatcher::new(engine);
        let outcome = dispatcher.dispatch(CanonicalSourceId::canonicalize("ghost")).await;
        assert!(matches!(outcome, DispatchOutcome::Skipped));
    }

    #[tokio::test]
    async fn registered_source_dispatches_and_completes() {
        let registry = Arc::new(Registry::new(heatlink_registry::AliasTable::new()));
        registry
            .register(Arc::new(ScriptedAdapter::returning("demo", 60_000, 30_000, vec!["A".into()])))
            .unwrap();
        let engine = build_engine(registry);
        let dispatcher = EngineDispatcher::new(engine);
        let outcome = dispatcher.dispatch(CanonicalSourceId::canonicalize("demo")).await;
        assert!(matches!(outcome, DispatchOutcome::Completed { success: true, .. }));
    }
}
