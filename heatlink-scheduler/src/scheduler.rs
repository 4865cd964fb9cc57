use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use heatlink_core::{CanonicalSourceId, SourceDescriptor};
use heatlink_support::{Clock, Jitter, Monotonic};
use tracing::{debug, trace};

use crate::backoff::{self, BackoffInput, Freshness};
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::entry::ScheduleEntry;

/// Sources dispatched concurrently per tick, unless overridden (§4.6).
pub const DEFAULT_CONCURRENCY: usize = 8;
/// How often the tick loop wakes to look for due sources (§4.6).
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Adaptive per-source fetch scheduler (§4.6).
///
/// Holds no knowledge of the registry, cache, or HTTP stack — due sources
/// are handed to a [`Dispatcher`] (the Fetch Engine) which reports back what
/// happened so the scheduler can compute the next backoff interval.
pub struct Scheduler {
    entries: DashMap<CanonicalSourceId, ScheduleEntry>,
    clock: Arc<dyn Clock>,
    jitter: Arc<dyn Jitter>,
    dispatcher: Arc<dyn Dispatcher>,
    concurrency: usize,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>, jitter: Arc<dyn Jitter>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self::with_concurrency(clock, jitter, dispatcher, DEFAULT_CONCURRENCY)
    }

    pub fn with_concurrency(
        clock: Arc<dyn Clock>,
        jitter: Arc<dyn Jitter>,
        dispatcher: Arc<dyn Dispatcher>,
        concurrency: usize,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            jitter,
            dispatcher,
            concurrency,
        }
    }

    /// Registers (or re-registers) a source, spreading its first due time
    /// across `[now, now + update_interval_ms)` to avoid a thundering herd
    /// on startup (§4.6).
    pub fn register(&self, descriptor: &SourceDescriptor) {
        let spread = backoff::startup_spread(descriptor.update_interval_ms, self.jitter.as_ref());
        let next_due_at = self.clock.now().saturating_add(spread);
        self.entries
            .insert(descriptor.source_id().clone(), ScheduleEntry::new(descriptor, next_due_at));
    }

    pub fn deregister(&self, source_id: &str) {
        let canonical = CanonicalSourceId::canonicalize(source_id);
        self.entries.remove(&canonical);
    }

    /// Due, adaptive-enabled sources ordered by descending priority, ties
    /// broken by oldest `next_due_at` (§4.6).
    fn due_sources(&self, now: Monotonic) -> Vec<CanonicalSourceId> {
        let mut due: Vec<(i32, Monotonic, CanonicalSourceId)> = self
            .entries
            .iter()
            .filter(|entry| entry.is_due(now))
            .map(|entry| (entry.priority, entry.next_due_at, entry.source_id.clone()))
            .collect();
        due.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
        due.into_iter().map(|(_, _, source_id)| source_id).collect()
    }

    /// Dispatches every currently-due source, bounded by `concurrency`
    /// in-flight dispatches, and updates each entry's schedule from the
    /// outcome (§4.6).
    pub async fn tick(&self) {
        let now = self.clock.now();
        let due = self.due_sources(now);
        if due.is_empty() {
            return;
        }
        trace!(count = due.len(), "dispatching due sources");

        let dispatcher = &self.dispatcher;
        let outcomes: Vec<(CanonicalSourceId, DispatchOutcome)> = stream::iter(due)
            .map(|source_id| async move {
                let outcome = dispatcher.dispatch(source_id.clone()).await;
                (source_id, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (source_id, outcome) in outcomes {
            self.apply_outcome(&source_id, outcome);
        }
    }

    fn apply_outcome(&self, source_id: &CanonicalSourceId, outcome: DispatchOutcome) {
        let DispatchOutcome::Completed {
            success,
            duration_ms,
            new_item_count,
        } = outcome
        else {
            trace!(source_id = %source_id, "source already in flight, due time unchanged");
            return;
        };

        let Some(mut entry) = self.entries.get_mut(source_id) else {
            return;
        };

        entry.consecutive_failures = if success { 0 } else { entry.consecutive_failures + 1 };
        let freshness = if success {
            Freshness::Succeeded { new_item_count }
        } else {
            Freshness::Failed
        };
        let interval = backoff::next_interval(
            BackoffInput {
                base_ms: entry.update_interval_ms,
                consecutive_failures: entry.consecutive_failures,
                duration_ms,
                freshness,
            },
            self.jitter.as_ref(),
        );
        entry.next_due_at = self.clock.now().saturating_add(interval);
        debug!(source_id = %source_id, interval_ms = interval.as_millis() as u64, "rescheduled source");
    }

    /// Runs the tick loop until `shutdown` fires.
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.tick().await,
                result = shutdown.changed() => {
                    if result.is_err() || *shutdown.borrow() {
                        debug!("scheduler shutting down");
                        return;
                    }
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn next_due_at(&self, source_id: &str) -> Option<Monotonic> {
        let canonical = CanonicalSourceId::canonicalize(source_id);
        self.entries.get(&canonical).map(|entry| entry.next_due_at)
    }

    #[cfg(test)]
    pub(crate) fn consecutive_failures(&self, source_id: &str) -> Option<u32> {
        let canonical = CanonicalSourceId::canonicalize(source_id);
        self.entries.get(&canonical).map(|entry| entry.consecutive_failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use heatlink_core::SourceKind;
    use heatlink_support::{TestClock, TestJitter};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex as AsyncMutex;

    struct ScriptedDispatcher {
        calls: AsyncMutex<Vec<CanonicalSourceId>>,
        outcome: DispatchOutcome,
        call_count: AtomicUsize,
    }

    impl ScriptedDispatcher {
        fn new(outcome: DispatchOutcome) -> Self {
            Self {
                calls: AsyncMutex::new(Vec::new()),
                outcome,
                call_count: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Dispatcher for ScriptedDispatcher {
        async fn dispatch(&self, source_id: CanonicalSourceId) -> DispatchOutcome {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().await.push(source_id);
            self.outcome
        }
    }

    fn epoch() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z").unwrap().with_timezone(&Utc)
    }

    fn descriptor(source_id: &str, priority: i32) -> SourceDescriptor {
        SourceDescriptor::new(source_id, "Demo", "https://demo", SourceKind::Api, 60_000, 30_000)
            .unwrap()
            .with_priority(priority)
    }

    #[tokio::test]
    async fn source_not_due_before_its_spread_elapses() {
        let clock = Arc::new(TestClock::new(epoch()));
        let jitter = Arc::new(TestJitter::fixed(1.0));
        let dispatcher = Arc::new(ScriptedDispatcher::new(DispatchOutcome::Completed {
            success: true,
            duration_ms: 100,
            new_item_count: 10,
        }));
        let scheduler = Scheduler::new(clock.clone(), jitter, dispatcher.clone());
        scheduler.register(&descriptor("demo", 0));

        scheduler.tick().await;
        assert_eq!(dispatcher.call_count.load(Ordering::SeqCst), 0);

        clock.advance(Duration::from_millis(60_000));
        scheduler.tick().await;
        assert_eq!(dispatcher.call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn higher_priority_dispatched_first() {
        let clock = Arc::new(TestClock::new(epoch()));
        let jitter = Arc::new(TestJitter::zero());
        let dispatcher = Arc::new(ScriptedDispatcher::new(DispatchOutcome::Completed {
            success: true,
            duration_ms: 100,
            new_item_count: 10,
        }));
        let scheduler = Scheduler::new(clock.clone(), jitter, dispatcher.clone());
        scheduler.register(&descriptor("low", 0));
        scheduler.register(&descriptor("high", 10));

        let due = scheduler.due_sources(clock.now());
        assert_eq!(due[0].as_str(), "high");
        assert_eq!(due[1].as_str(), "low");
    }

    #[tokio::test]
    async fn skipped_dispatch_does_not_advance_due_time() {
        let clock = Arc::new(TestClock::new(epoch()));
        let jitter = Arc::new(TestJitter::zero());
        let dispatcher = Arc::new(ScriptedDispatcher::new(DispatchOutcome::Skipped));
        let scheduler = Scheduler::new(clock.clone(), jitter, dispatcher);
        scheduler.register(&descriptor("demo", 0));

        let before = scheduler.next_due_at("demo").unwrap();
        scheduler.tick().await;
        let after = scheduler.next_due_at("demo").unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn failure_increments_consecutive_failures_and_extends_interval() {
        let clock = Arc::new(TestClock::new(epoch()));
        let jitter = Arc::new(TestJitter::zero());
        let dispatcher = Arc::new(ScriptedDispatcher::new(DispatchOutcome::Completed {
            success: false,
            duration_ms: 100,
            new_item_count: 0,
        }));
        let scheduler = Scheduler::new(clock.clone(), jitter, dispatcher);
        scheduler.register(&descriptor("demo", 0));
        scheduler.tick().await;

        assert_eq!(scheduler.consecutive_failures("demo"), Some(1));
        let next_due = scheduler.next_due_at("demo").unwrap();
        assert!(next_due.saturating_duration_since(clock.now()) >= Duration::from_millis(120_000));
    }

    #[tokio::test]
    async fn deregistered_source_is_never_dispatched() {
        let clock = Arc::new(TestClock::new(epoch()));
        let jitter = Arc::new(TestJitter::zero());
        let dispatcher = Arc::new(ScriptedDispatcher::new(DispatchOutcome::Completed {
            success: true,
            duration_ms: 100,
            new_item_count: 10,
        }));
        let scheduler = Scheduler::new(clock.clone(), jitter, dispatcher.clone());
        scheduler.register(&descriptor("demo", 0));
        scheduler.deregister("demo");

        clock.advance(Duration::from_millis(60_000));
        scheduler.tick().await;
        assert_eq!(dispatcher.call_count.load(Ordering::SeqCst), 0);
    }
}
