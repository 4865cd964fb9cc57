use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use heatlink_cache::{CacheLayer, UpdateOutcome};
use heatlink_core::{CallType, CanonicalSourceId, ErrorKind, NewsItem, ProxyPolicy, SourceDescriptor};
use heatlink_http::{ClientSpec, HttpClientFactory};
use heatlink_proxy::{ProxyPool, ProxySelection};
use reqwest::Url;
use heatlink_registry::{AdapterFactory, FetchContext, Registry};
use heatlink_scheduler::DispatchOutcome;
use heatlink_stats::StatsCollector;
use heatlink_support::Clock;
use tokio::sync::Semaphore;
use tracing::{info_span, warn, Instrument};

use crate::config::EngineConfig;
use crate::coordinator::{wait_for_result, FetchCoordinator, Role};
use crate::emitter::DownstreamEmitter;
use crate::error::EngineError;
use crate::stats_adapter::StatsRecordingAdapter;

/// Options accepted by [`Engine::get_news`] (§4.7).
#[derive(Debug, Clone, Default)]
pub struct GetNewsOptions {
    pub force_refresh: bool,
    /// Caller's remaining budget. `None` falls back to the source's
    /// effective fetch deadline.
    pub deadline_ms: Option<u64>,
    pub call_type: Option<CallType>,
}

/// Observability metadata returned alongside [`Engine::get_news`]'s items.
#[derive(Debug, Clone, Default)]
pub struct FetchMeta {
    pub cache_hit: bool,
    pub protection_applied: bool,
    pub age_ms: u64,
    pub error_kind: Option<ErrorKind>,
}

/// The outcome of one leader's run, shared with every follower coalesced
/// behind it (§4.9).
#[derive(Debug, Clone)]
struct FetchOutcome {
    committed_items: Vec<NewsItem>,
    protection_applied: bool,
    success: bool,
    error_kind: Option<ErrorKind>,
    error_message: Option<String>,
    duration_ms: u64,
    new_item_count: u64,
}

/// Orchestrates the registry, cache, proxy pool, stats collector and
/// downstream emitter behind the `GetNews`/`FetchSource` surface (§4.7).
pub struct Engine {
    pub(crate) registry: Arc<Registry>,
    pub(crate) adapter_factory: AdapterFactory,
    pub(crate) cache: Arc<CacheLayer>,
    pub(crate) proxy_pool: Arc<ProxyPool>,
    pub(crate) stats: Arc<StatsCollector>,
    pub(crate) emitter: Arc<dyn DownstreamEmitter>,
    http_factory: HttpClientFactory,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    coordinator: FetchCoordinator<FetchOutcome>,
    fetch_semaphore: Arc<Semaphore>,
    accepting: AtomicBool,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<Registry>,
        adapter_factory: AdapterFactory,
        cache: Arc<CacheLayer>,
        proxy_pool: Arc<ProxyPool>,
        stats: Arc<StatsCollector>,
        emitter: Arc<dyn DownstreamEmitter>,
        clock: Arc<dyn Clock>,
        config: EngineConfig,
    ) -> Arc<Self> {
        proxy_pool.set_required_domains(config.proxy_required_domains.clone());
        let fetch_semaphore = Arc::new(Semaphore::new(config.global_fetch_concurrency));
        Arc::new(Self {
            registry,
            adapter_factory,
            cache,
            proxy_pool,
            stats,
            emitter,
            http_factory: HttpClientFactory::new(),
            clock,
            config,
            coordinator: FetchCoordinator::new(),
            fetch_semaphore,
            accepting: AtomicBool::new(true),
        })
    }

    /// `GetNews(source_id, options) -> (items, meta)` (§4.7).
    pub async fn get_news(
        self: &Arc<Self>,
        source_id: &str,
        options: GetNewsOptions,
    ) -> Result<(Vec<NewsItem>, FetchMeta), EngineError> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(EngineError::Canceled);
        }

        // Step 1: canonicalize + resolve.
        let adapter = self.registry.get(source_id).ok_or(EngineError::UnknownSource)?;
        let descriptor = adapter.metadata().clone();
        let canonical = descriptor.source_id().clone();
        let call_type = options.call_type.unwrap_or(CallType::External);
        let deadline_ms = options.deadline_ms.unwrap_or_else(|| descriptor.effective_fetch_deadline_ms());

        // Step 2: cache-first, unless forced.
        if !options.force_refresh {
            let lookup = self.cache.lookup(&canonical, descriptor.cache_ttl_ms).await;
            if lookup.valid {
                return Ok((
                    lookup.items,
                    FetchMeta {
                        cache_hit: true,
                        protection_applied: false,
                        age_ms: lookup.age_ms,
                        error_kind: None,
                    },
                ));
            }
        }

        // Step 3: single-flight.
        let outcome = match self.coordinator.join(&canonical) {
            Role::Leader(tx) => {
                let engine = Arc::clone(self);
                let source_id_for_task = canonical.clone();
                let handle = tokio::spawn(
                    async move {
                        let outcome = engine.run_fetch(source_id_for_task.clone(), call_type).await;
                        engine.coordinator.finish(&source_id_for_task, tx, outcome.clone());
                        outcome
                    }
                    .instrument(info_span!("fetch_source", source_id = %canonical, call_type = %call_type)),
                );
                match handle.await {
                    Ok(outcome) => Some(Arc::new(outcome)),
                    Err(_) => None,
                }
            }
            Role::Follower(rx) => wait_for_result(rx, Duration::from_millis(deadline_ms)).await,
        };

        match outcome {
            Some(outcome) => {
                if outcome.success || !outcome.committed_items.is_empty() {
                    Ok((
                        outcome.committed_items.clone(),
                        FetchMeta {
                            cache_hit: false,
                            protection_applied: outcome.protection_applied,
                            age_ms: 0,
                            error_kind: outcome.error_kind,
                        },
                    ))
                } else {
                    Err(EngineError::Classified(
                        outcome.error_kind.unwrap_or(ErrorKind::AdapterInternal),
                        outcome.error_message.clone().unwrap_or_else(|| "fetch failed".to_string()),
                    ))
                }
            }
            None => {
                // Follower timed out. Fall back to whatever is cached,
                // even if stale, before surfacing in_flight_timeout.
                let lookup = self.cache.lookup(&canonical, u64::MAX).await;
                if !lookup.items.is_empty() {
                    Ok((
                        lookup.items,
                        FetchMeta {
                            cache_hit: false,
                            protection_applied: false,
                            age_ms: lookup.age_ms,
                            error_kind: Some(ErrorKind::InFlightTimeout),
                        },
                    ))
                } else {
                    Err(EngineError::InFlightTimeout)
                }
            }
        }
    }

    /// `FetchSource(source_id, call_type) -> outcome` (§4.7), the
    /// scheduler's entrypoint. Implements [`heatlink_scheduler::Dispatcher`]
    /// via [`crate::dispatcher::EngineDispatcher`].
    pub async fn fetch_source(self: &Arc<Self>, source_id: &CanonicalSourceId, call_type: CallType) -> DispatchOutcome {
        if !self.accepting.load(Ordering::SeqCst) {
            return DispatchOutcome::Skipped;
        }
        if self.registry.get_canonical(source_id).is_none() {
            return DispatchOutcome::Skipped;
        }
        if self.coordinator.in_flight(source_id) {
            // §4.8: a tick that finds a source already running is a no-op.
            return DispatchOutcome::Skipped;
        }

        let engine = Arc::clone(self);
        let source_id = source_id.clone();
        let outcome = match engine.coordinator.join(&source_id) {
            Role::Leader(tx) => {
                let outcome = engine.run_fetch(source_id.clone(), call_type).await;
                engine.coordinator.finish(&source_id, tx, outcome.clone());
                outcome
            }
            Role::Follower(_) => return DispatchOutcome::Skipped,
        };

        DispatchOutcome::Completed {
            success: outcome.success,
            duration_ms: outcome.duration_ms,
            new_item_count: outcome.new_item_count,
        }
    }

    /// Steps 4-10 of §4.7: fetch, normalize, commit, record, emit.
    async fn run_fetch(self: Arc<Self>, source_id: CanonicalSourceId, call_type: CallType) -> FetchOutcome {
        let Some(adapter) = self.registry.get_canonical(&source_id) else {
            return FetchOutcome {
                committed_items: Vec::new(),
                protection_applied: false,
                success: false,
                error_kind: Some(ErrorKind::UnknownSource),
                error_message: Some("source deregistered before dispatch".to_string()),
                duration_ms: 0,
                new_item_count: 0,
            };
        };
        let adapter = StatsRecordingAdapter::wrap(adapter);
        let descriptor = adapter.metadata().clone();

        let _permit = self
            .fetch_semaphore
            .acquire()
            .await
            .expect("fetch semaphore is never closed");
        let started = self.clock.now();
        let fetch_result = self.attempt_fetch(&descriptor, &adapter, call_type).await;
        let duration_ms = self.clock.now().saturating_duration_since(started).as_millis() as u64;

        let (mut items, success, error_kind, error_message) = match fetch_result {
            Ok(items) => (items, true, None, None),
            Err(err) => {
                let message = heatlink_stats::truncate_error_message(&err.to_string());
                (Vec::new(), false, Some(err.kind()), Some(message))
            }
        };

        // Step 5: normalize.
        for item in &mut items {
            item.normalize(&source_id, &descriptor.name);
        }
        items.truncate(heatlink_core::MAX_ITEMS_PER_SOURCE);

        // Step 6: commit via protection policy.
        let update_outcome = if success {
            UpdateOutcome::success()
        } else {
            UpdateOutcome::failure(error_kind.map(ErrorKind::as_str).unwrap_or("adapter_internal"))
        };
        let update = self
            .cache
            .update(
                &source_id,
                items,
                update_outcome,
                descriptor.effective_shrink_protection_ratio(),
                descriptor.cache_ttl_ms,
            )
            .await;
        // §4.6 `factor_quiet` wants items unseen in the pre-update cache,
        // not the adapter's raw count — `CacheLayer::update` diffs against
        // the prior entry's ids before this source's `factor_quiet` sees it.
        let new_item_count = update.new_item_count;

        // Step 7: record stats.
        let cache_used = update.protection_applied();
        self.stats
            .record(heatlink_stats::StatsOutcome {
                source_id: source_id.clone(),
                started_at: self.clock.utc_now(),
                duration_ms,
                success,
                item_count: update.committed_items.len(),
                cache_used,
                error_kind,
                error_message: error_message.clone(),
                api_call_type: call_type,
            })
            .await;

        // Step 10: emit, only when the live fetch committed new items
        // (§9 open question: cache hits do not re-emit).
        if !cache_used && !update.committed_items.is_empty() {
            let emitter = Arc::clone(&self.emitter);
            let emit_sid = source_id.clone();
            let emit_items = update.committed_items.clone();
            let ack_timeout = Duration::from_millis(self.config.emit_ack_timeout_ms);
            match tokio::time::timeout(ack_timeout, emitter.emit(&emit_sid, &emit_items, call_type)).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(source_id = %emit_sid, error = %err, "downstream emit failed"),
                Err(_) => warn!(source_id = %emit_sid, "downstream emit timed out"),
            }
        }

        FetchOutcome {
            committed_items: update.committed_items,
            protection_applied: cache_used,
            success,
            error_kind,
            error_message,
            duration_ms,
            new_item_count,
        }
    }

    /// One fetch attempt through the proxy pool, with a single retry
    /// through the next-ranked proxy on a network failure (§7 retry
    /// policy exception).
    async fn attempt_fetch(
        &self,
        descriptor: &SourceDescriptor,
        adapter: &Arc<dyn heatlink_registry::Adapter>,
        call_type: CallType,
    ) -> Result<Vec<NewsItem>, EngineError> {
        let deadline_ms = descriptor.effective_fetch_deadline_ms();
        let ctx = FetchContext { deadline_ms, call_type };

        let selection = self.select_proxy(descriptor)?;
        let client = self.build_client(descriptor, &selection)?;

        let first = adapter.fetch(&ctx, &client).await;
        match first {
            Ok(items) => {
                self.record_proxy_success(&selection);
                Ok(items)
            }
            Err(err) if self.requires_proxy_retry(&selection, &err) => {
                self.record_proxy_failure(&selection);
                let retry_selection = self.select_proxy(descriptor)?;
                let retry_client = self.build_client(descriptor, &retry_selection)?;
                match adapter.fetch(&ctx, &retry_client).await {
                    Ok(items) => {
                        self.record_proxy_success(&retry_selection);
                        Ok(items)
                    }
                    Err(retry_err) => {
                        self.record_proxy_failure(&retry_selection);
                        Err(EngineError::Adapter(retry_err))
                    }
                }
            }
            Err(err) => {
                self.record_proxy_failure(&selection);
                Err(EngineError::Adapter(err))
            }
        }
    }

    /// Resolves a source's `proxy_policy` against the pool's domain-pattern
    /// rules (§4.2): `never` always bypasses the pool, `always`/`if-required`
    /// go through [`ProxyPool::select`].
    fn select_proxy(&self, descriptor: &SourceDescriptor) -> Result<ProxySelection, EngineError> {
        if descriptor.proxy_policy == ProxyPolicy::Never {
            return Ok(ProxySelection::Direct);
        }
        let needs_proxy = match Url::parse(&descriptor.home_url) {
            Ok(url) => self.proxy_pool.requires_proxy(&url, descriptor.proxy_policy),
            Err(_) => descriptor.proxy_policy == ProxyPolicy::Always,
        };
        if !needs_proxy {
            return Ok(ProxySelection::Direct);
        }
        self.proxy_pool
            .select(descriptor.proxy_group.as_deref(), descriptor.allow_fallback_direct)
            .map_err(EngineError::Proxy)
    }

    fn requires_proxy_retry(&self, selection: &ProxySelection, err: &heatlink_registry::AdapterError) -> bool {
        matches!(selection, ProxySelection::Proxy(_)) && err.kind() == ErrorKind::Network
    }

    /// Builds the per-attempt client carrying the source's connect/read
    /// timeout overrides and TLS-verify opt-out (§4.3), falling back to the
    /// engine-wide defaults when the source didn't override them.
    fn build_client(&self, descriptor: &SourceDescriptor, selection: &ProxySelection) -> Result<reqwest::Client, EngineError> {
        let mut spec = ClientSpec::new(self.config.default_user_agent.clone())
            .with_connect_timeout(Duration::from_millis(descriptor.effective_connect_timeout_ms()))
            .with_read_timeout(Duration::from_millis(descriptor.effective_read_timeout_ms()))
            .with_tls_verify(descriptor.tls_verify);
        if let ProxySelection::Proxy(proxy) = selection {
            spec = spec.with_proxy(proxy.clone());
        }
        self.http_factory.build(&spec).map_err(EngineError::Http)
    }

    fn record_proxy_success(&self, selection: &ProxySelection) {
        if let ProxySelection::Proxy(proxy) = selection {
            self.proxy_pool.record_outcome(&proxy.proxy_id, true, None);
        }
    }

    fn record_proxy_failure(&self, selection: &ProxySelection) {
        if let ProxySelection::Proxy(proxy) = selection {
            self.proxy_pool.record_outcome(&proxy.proxy_id, false, None);
        }
    }

    /// Stops accepting new `GetNews`/`FetchSource` calls and waits up to
    /// `grace` for in-flight leaders to finish (§5, §14).
    pub async fn shutdown(self: &Arc<Self>, grace: Duration) {
        self.accepting.store(false, Ordering::SeqCst);
        let deadline = self.clock.now().saturating_add(grace);
        while self.coordinator_has_any_in_flight() {
            if self.clock.now().has_reached(deadline) {
                warn!("engine shutdown grace period elapsed with fetches still in flight");
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.stats.flush_all().await;
    }

    fn coordinator_has_any_in_flight(&self) -> bool {
        self.registry.list().iter().any(|sid| self.coordinator.in_flight(sid))
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn proxy_pool(&self) -> &Arc<ProxyPool> {
        &self.proxy_pool
    }

    pub fn cache(&self) -> &Arc<CacheLayer> {
        &self.cache
    }

    pub fn stats(&self) -> &Arc<StatsCollector> {
        &self.stats
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
