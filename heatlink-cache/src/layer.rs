use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use heatlink_core::{CanonicalSourceId, ItemId, NewsItem};
use heatlink_support::Clock;
use tracing::{trace, warn};

use crate::entry::{CacheEntry, CacheStatusSnapshot};
use crate::protection::{protect, ProtectionDecision, ProtectionKind};
use crate::shared::SharedCache;

/// Outcome of the fetch that produced `new_items`, as seen by the
/// protection policy (§4.1). Only the success flag matters here; the rest
/// of a `StatsOutcome` is the Stats Collector's concern.
#[derive(Debug, Clone, Copy)]
pub struct UpdateOutcome {
    pub success: bool,
    /// Human-readable error, recorded as `CacheEntry::last_error` on a
    /// failed outcome.
    pub error_message: Option<&'static str>,
}

impl UpdateOutcome {
    pub fn success() -> Self {
        Self { success: true, error_message: None }
    }

    pub fn failure(error_message: &'static str) -> Self {
        Self { success: false, error_message: Some(error_message) }
    }
}

/// Result of [`CacheLayer::lookup`] (§4.1).
#[derive(Debug, Clone)]
pub struct LookupResult {
    pub items: Vec<NewsItem>,
    pub age_ms: u64,
    pub valid: bool,
}

/// Result of [`CacheLayer::update`] (§4.1).
#[derive(Debug, Clone)]
pub struct UpdateResult {
    pub committed_items: Vec<NewsItem>,
    /// `Some(kind)` when a protection rule fired and `committed_items` are
    /// the pre-update items rather than the adapter's fresh result.
    pub protection: Option<ProtectionKind>,
    /// Count of `new_items` passed to `update` whose [`ItemId`] was not
    /// already present in the entry's pre-update items (§4.6 `factor_quiet`:
    /// "id-unseen-in-cache"). Computed against the adapter's raw result,
    /// independent of whether a protection rule kept the old items instead.
    pub new_item_count: u64,
}

impl UpdateResult {
    pub fn protection_applied(&self) -> bool {
        self.protection.is_some()
    }
}

/// The engine's per-source cache, authoritative for protection decisions
/// (§4.1), with an optional [`SharedCache`] second tier.
pub struct CacheLayer {
    entries: DashMap<CanonicalSourceId, CacheEntry>,
    shared: Option<Arc<dyn SharedCache>>,
    clock: Arc<dyn Clock>,
}

impl CacheLayer {
    /// Create an empty cache layer with no shared-cache tier.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            shared: None,
            clock,
        }
    }

    /// Attach a shared-cache second tier, consulted only on a cold
    /// in-memory entry (§4.1).
    pub fn with_shared_cache(mut self, shared: Arc<dyn SharedCache>) -> Self {
        self.shared = Some(shared);
        self
    }

    /// `Lookup(source_id) -> (items, age_ms, valid)` (§4.1).
    ///
    /// On a cold in-memory cache, attempts a single shared-cache read to
    /// repopulate the entry before reporting a miss.
    pub async fn lookup(&self, source_id: &CanonicalSourceId, cache_ttl_ms: u64) -> LookupResult {
        if let Some(mut entry) = self.entries.get_mut(source_id) {
            let age_ms = self
                .clock
                .now()
                .saturating_duration_since(entry.fetched_at)
                .as_millis() as u64;
            let valid = age_ms <= cache_ttl_ms;
            if valid {
                entry.hit_count += 1;
            } else {
                entry.miss_count += 1;
            }
            return LookupResult {
                items: entry.items.clone(),
                age_ms,
                valid,
            };
        }

        if let Some(shared) = &self.shared {
            if let Ok(Some(bytes)) = shared.get(&source_id.cache_key()).await {
                if let Ok(items) = serde_json::from_slice::<Vec<NewsItem>>(&bytes) {
                    let now = self.clock.now();
                    let mut entry = CacheEntry::new(items.clone(), now);
                    entry.hit_count = 1;
                    self.entries.insert(source_id.clone(), entry);
                    return LookupResult {
                        items,
                        age_ms: 0,
                        valid: true,
                    };
                }
            }
        }

        // Record the miss so Status() reflects real traffic even for a
        // source that has never had a successful fetch.
        self.entries
            .entry(source_id.clone())
            .and_modify(|e| e.miss_count += 1);

        LookupResult {
            items: Vec::new(),
            age_ms: u64::MAX,
            valid: false,
        }
    }

    /// `Update(source_id, new_items, outcome) -> committed_items` (§4.1).
    ///
    /// Runs the protection policy, commits the winning item set atomically
    /// with respect to concurrent [`CacheLayer::lookup`] calls (both go
    /// through the same `DashMap` shard lock), and — on an unprotected
    /// replace — writes through to the shared cache, if configured.
    pub async fn update(
        &self,
        source_id: &CanonicalSourceId,
        new_items: Vec<NewsItem>,
        outcome: UpdateOutcome,
        shrink_ratio: f64,
        cache_ttl_ms: u64,
    ) -> UpdateResult {
        let now = self.clock.now();
        let new_count = new_items.len();

        let (committed, protection, new_item_count) = match self.entries.entry(source_id.clone()) {
            Entry::Occupied(mut occ) => {
                let cur_count = occ.get().size();
                // §4.6 `factor_quiet` counts items "id-unseen-in-cache" —
                // diffed against what was cached *before* this update,
                // regardless of whether protection ends up keeping it.
                let new_item_count = {
                    let previous_ids: HashSet<&ItemId> = occ.get().items.iter().map(|item| &item.id).collect();
                    new_items.iter().filter(|item| !previous_ids.contains(&item.id)).count() as u64
                };
                let decision = protect(cur_count, new_count, outcome.success, shrink_ratio);
                match decision {
                    ProtectionDecision::Keep(kind) => {
                        let e = occ.get_mut();
                        match kind {
                            ProtectionKind::Error => e.protection_counters.error_protection_count += 1,
                            ProtectionKind::Empty => e.protection_counters.empty_protection_count += 1,
                            ProtectionKind::Shrink => e.protection_counters.shrink_protection_count += 1,
                        }
                        if !outcome.success {
                            e.last_error = outcome.error_message.map(str::to_string);
                        }
                        warn!(source_id = %source_id, ?kind, cur_count, new_count, "cache protection applied");
                        (e.items.clone(), Some(kind), new_item_count)
                    }
                    ProtectionDecision::Replace => {
                        trace!(source_id = %source_id, new_count, "cache replaced");
                        let e = occ.get_mut();
                        e.items = new_items.clone();
                        e.fetched_at = now;
                        e.last_error = if outcome.success {
                            None
                        } else {
                            outcome.error_message.map(str::to_string)
                        };
                        e.record_size();
                        (new_items, None, new_item_count)
                    }
                }
            }
            Entry::Vacant(vac) => {
                // cur_count = 0: failure always replaces with empty (§4.1
                // row 2); success always replaces (no protection possible
                // against an absent entry). Every item is unseen.
                let new_item_count = new_items.len() as u64;
                let mut entry = CacheEntry::new(new_items.clone(), now);
                if !outcome.success {
                    entry.last_error = outcome.error_message.map(str::to_string);
                }
                vac.insert(entry);
                (new_items, None, new_item_count)
            }
        };

        if protection.is_none() {
            if let Some(shared) = &self.shared {
                if let Ok(bytes) = serde_json::to_vec(&committed) {
                    let _ = shared
                        .set(&source_id.cache_key(), Bytes::from(bytes), cache_ttl_ms)
                        .await;
                }
            }
        }

        UpdateResult {
            committed_items: committed,
            protection,
            new_item_count,
        }
    }

    /// Drop a source's in-memory entry (explicit admin action, §3.3
    /// lifecycle; never triggered by TTL alone).
    pub fn clear(&self, source_id: &CanonicalSourceId) {
        self.entries.remove(source_id);
    }

    /// A monitoring snapshot of a source's entry, if one exists (§4.1).
    pub fn status(&self, source_id: &CanonicalSourceId) -> Option<CacheStatusSnapshot> {
        self.entries.get(source_id).map(|e| CacheStatusSnapshot::from(&*e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatlink_core::test_helpers::quick_item;
    use heatlink_support::TestClock;
    use std::time::Duration;

    fn sid(raw: &str) -> CanonicalSourceId {
        CanonicalSourceId::canonicalize(raw)
    }

    fn clock() -> Arc<TestClock> {
        Arc::new(TestClock::new(chrono::Utc::now()))
    }

    #[tokio::test]
    async fn lookup_on_cold_cache_is_a_miss() {
        let layer = CacheLayer::new(clock());
        let result = layer.lookup(&sid("demo"), 60_000).await;
        assert!(!result.valid);
        assert!(result.items.is_empty());
    }

    #[tokio::test]
    async fn update_then_lookup_round_trips() {
        let layer = CacheLayer::new(clock());
        let items = vec![quick_item("demo", "a"), quick_item("demo", "b")];
        let result = layer
            .update(&sid("demo"), items.clone(), UpdateOutcome::success(), 0.30, 60_000)
            .await;
        assert!(!result.protection_applied());
        assert_eq!(result.committed_items.len(), 2);
        assert_eq!(result.new_item_count, 2, "every item is unseen against an absent entry");

        let lookup = layer.lookup(&sid("demo"), 60_000).await;
        assert!(lookup.valid);
        assert_eq!(lookup.items.len(), 2);
    }

    #[tokio::test]
    async fn new_item_count_is_zero_when_every_item_was_already_cached() {
        let layer = CacheLayer::new(clock());
        let items = vec![quick_item("demo", "a"), quick_item("demo", "b")];
        layer
            .update(&sid("demo"), items.clone(), UpdateOutcome::success(), 0.30, 60_000)
            .await;

        // Same source returns the exact same items again: nothing is new.
        let result = layer
            .update(&sid("demo"), items, UpdateOutcome::success(), 0.30, 60_000)
            .await;
        assert_eq!(result.new_item_count, 0);
    }

    #[tokio::test]
    async fn new_item_count_only_counts_ids_unseen_in_the_prior_entry() {
        let layer = CacheLayer::new(clock());
        let first = vec![quick_item("demo", "a"), quick_item("demo", "b")];
        layer
            .update(&sid("demo"), first, UpdateOutcome::success(), 0.30, 60_000)
            .await;

        // "a" repeats, "c" and "d" are genuinely new.
        let second = vec![
            quick_item("demo", "a"),
            quick_item("demo", "c"),
            quick_item("demo", "d"),
        ];
        let result = layer
            .update(&sid("demo"), second, UpdateOutcome::success(), 0.30, 60_000)
            .await;
        assert_eq!(result.new_item_count, 2);
    }

    #[tokio::test]
    async fn lookup_invalid_after_ttl_elapses() {
        let clock = clock();
        let layer = CacheLayer::new(clock.clone());
        layer
            .update(&sid("demo"), vec![quick_item("demo", "a")], UpdateOutcome::success(), 0.30, 60_000)
            .await;
        clock.advance(Duration::from_secs(61));
        let lookup = layer.lookup(&sid("demo"), 60_000).await;
        assert!(!lookup.valid);
        assert_eq!(lookup.items.len(), 1, "items remain readable even when stale");
    }

    #[tokio::test]
    async fn shrink_protection_keeps_existing_items() {
        let layer = CacheLayer::new(clock());
        let ten: Vec<_> = (0..10).map(|i| quick_item("demo", &format!("{i}"))).collect();
        layer
            .update(&sid("demo"), ten.clone(), UpdateOutcome::success(), 0.30, 60_000)
            .await;

        let two = vec![quick_item("demo", "x"), quick_item("demo", "y")];
        let result = layer
            .update(&sid("demo"), two, UpdateOutcome::success(), 0.30, 60_000)
            .await;

        assert_eq!(result.protection, Some(ProtectionKind::Shrink));
        assert_eq!(result.committed_items.len(), 10);
    }

    #[tokio::test]
    async fn failure_with_warm_cache_keeps_items_and_records_error() {
        let layer = CacheLayer::new(clock());
        layer
            .update(&sid("demo"), vec![quick_item("demo", "a")], UpdateOutcome::success(), 0.30, 60_000)
            .await;

        let result = layer
            .update(&sid("demo"), vec![], UpdateOutcome::failure("network"), 0.30, 60_000)
            .await;
        assert_eq!(result.protection, Some(ProtectionKind::Error));
        assert_eq!(result.committed_items.len(), 1);

        let status = layer.status(&sid("demo")).unwrap();
        assert_eq!(status.last_error.as_deref(), Some("network"));
        assert_eq!(status.protection_counters.error_protection_count, 1);
    }

    #[tokio::test]
    async fn clear_drops_the_entry() {
        let layer = CacheLayer::new(clock());
        layer
            .update(&sid("demo"), vec![quick_item("demo", "a")], UpdateOutcome::success(), 0.30, 60_000)
            .await;
        layer.clear(&sid("demo"));
        assert!(layer.status(&sid("demo")).is_none());
    }
}
