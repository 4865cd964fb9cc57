use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use heatlink_core::{CallType, CanonicalSourceId};
use heatlink_support::Clock;
use tracing::{debug, warn};

use crate::aggregate::AggregateSnapshot;
use crate::outcome::StatsOutcome;
use crate::sink::{SourceStatus, SourceStatusKind, StatsSink};

/// Last N outcomes retained per source (§4.5).
pub const RING_CAPACITY: usize = 256;

/// Default interval between aggregate flushes when no failure forces an
/// earlier one (§4.5).
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(300);

struct SourceRecorder {
    ring: Mutex<VecDeque<StatsOutcome>>,
    snapshot: ArcSwap<AggregateSnapshot>,
}

impl SourceRecorder {
    fn new() -> Self {
        Self {
            ring: Mutex::new(VecDeque::with_capacity(RING_CAPACITY)),
            snapshot: ArcSwap::from_pointee(AggregateSnapshot::default()),
        }
    }

    fn push(&self, outcome: StatsOutcome) {
        let mut ring = self.ring.lock().expect("stats ring mutex poisoned");
        if ring.len() == RING_CAPACITY {
            ring.pop_front();
        }
        ring.push_back(outcome.clone());
        drop(ring);

        self.snapshot.rcu(|current| {
            let mut next = **current;
            next.record(&outcome);
            next
        });
    }

    fn latest(&self) -> Option<StatsOutcome> {
        self.ring.lock().expect("stats ring mutex poisoned").back().cloned()
    }

    fn snapshot(&self) -> Arc<AggregateSnapshot> {
        self.snapshot.load_full()
    }

    fn reset(&self) {
        self.snapshot.rcu(|current| {
            let mut next = **current;
            next.reset();
            next
        });
    }
}

/// Per-source ring buffer, live aggregates and sink flushing (§4.5).
///
/// Recording an outcome is lock-free with respect to concurrent aggregate
/// readers: the ring itself is guarded by a short-lived mutex, but the
/// published [`AggregateSnapshot`] is swapped in atomically via
/// [`arc_swap::ArcSwap::rcu`].
pub struct StatsCollector {
    sources: DashMap<CanonicalSourceId, Arc<SourceRecorder>>,
    sink: Arc<dyn StatsSink>,
    clock: Arc<dyn Clock>,
    flush_interval: Duration,
}

impl StatsCollector {
    pub fn new(sink: Arc<dyn StatsSink>, clock: Arc<dyn Clock>) -> Self {
        Self::with_flush_interval(sink, clock, DEFAULT_FLUSH_INTERVAL)
    }

    pub fn with_flush_interval(
        sink: Arc<dyn StatsSink>,
        clock: Arc<dyn Clock>,
        flush_interval: Duration,
    ) -> Self {
        Self {
            sources: DashMap::new(),
            sink,
            clock,
            flush_interval,
        }
    }

    fn recorder(&self, source_id: &CanonicalSourceId) -> Arc<SourceRecorder> {
        Arc::clone(
            self.sources
                .entry(source_id.clone())
                .or_insert_with(|| Arc::new(SourceRecorder::new()))
                .value(),
        )
    }

    /// Records one fetch outcome: appends it to the sink immediately,
    /// updates the live aggregates, and — if the outcome failed — flushes
    /// that source's aggregates without waiting for the next tick (§4.5).
    pub async fn record(&self, outcome: StatsOutcome) {
        let source_id = outcome.source_id.clone();
        let failed = !outcome.success;

        if let Err(err) = self.sink.append_stats_outcome(&outcome).await {
            warn!(source_id = %source_id, error = %err, "failed to append stats outcome");
        }

        self.recorder(&source_id).push(outcome);

        if failed {
            self.flush_source(&source_id).await;
        }
    }

    /// Aggregate view for one source and call type, if any outcomes have
    /// been recorded for it yet.
    pub fn aggregate_snapshot(&self, source_id: &CanonicalSourceId) -> Option<Arc<AggregateSnapshot>> {
        self.sources.get(source_id).map(|entry| entry.value().snapshot())
    }

    async fn flush_source(&self, source_id: &CanonicalSourceId) {
        let recorder = match self.sources.get(source_id) {
            Some(entry) => Arc::clone(entry.value()),
            None => return,
        };
        let snapshot = recorder.snapshot();

        for call_type in [CallType::Internal, CallType::External] {
            let aggregate = snapshot.for_call_type(call_type);
            if aggregate.total_requests == 0 {
                continue;
            }
            if let Err(err) = self
                .sink
                .upsert_aggregate(source_id.as_str(), call_type, aggregate)
                .await
            {
                warn!(source_id = %source_id, %call_type, error = %err, "failed to upsert aggregate");
            }
        }

        if let Some(latest) = recorder.latest() {
            let status = SourceStatus {
                status: status_kind(&snapshot),
                last_error: latest.error_message.clone(),
                last_update: latest.started_at,
                item_count: latest.item_count,
            };
            if let Err(err) = self.sink.upsert_source_status(source_id.as_str(), &status).await {
                warn!(source_id = %source_id, error = %err, "failed to upsert source status");
            }
        }

        recorder.reset();
        debug!(source_id = %source_id, "flushed stats aggregate");
    }

    /// Flushes every source with at least one recorded outcome since the
    /// last flush. Intended to be driven by a periodic tick (§4.5).
    pub async fn flush_all(&self) {
        let ids: Vec<CanonicalSourceId> = self.sources.iter().map(|entry| entry.key().clone()).collect();
        for source_id in ids {
            self.flush_source(&source_id).await;
        }
    }

    /// Runs the periodic flush loop until `shutdown` resolves, flushing
    /// everything once more before returning. Intended to be driven via
    /// `tokio::spawn` alongside the adaptive scheduler and proxy health
    /// sweep (§14).
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.flush_all().await,
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        debug!("stats collector shutting down");
                        self.flush_all().await;
                        return;
                    }
                }
            }
        }
    }

    #[cfg(test)]
    fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

fn status_kind(snapshot: &AggregateSnapshot) -> SourceStatusKind {
    let external = snapshot.external;
    let internal = snapshot.internal;
    let total = external.total_requests + internal.total_requests;
    if total == 0 {
        return SourceStatusKind::Ok;
    }
    let errors = external.error_count + internal.error_count;
    let rate = errors as f64 / total as f64;
    if rate >= 1.0 {
        SourceStatusKind::Failing
    } else if rate > 0.0 {
        SourceStatusKind::Degraded
    } else {
        SourceStatusKind::Ok
    }
}
