use heatlink_core::NewsItem;
use heatlink_support::Monotonic;

/// Counts of how often each protection rule has fired for a source (§3.3).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtectionCounters {
    pub error_protection_count: u64,
    pub empty_protection_count: u64,
    pub shrink_protection_count: u64,
}

/// A per-source cache entry (§3.3).
///
/// Created lazily on first successful fetch and mutated only by
/// [`crate::CacheLayer::update`]; never evicted by TTL alone.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub items: Vec<NewsItem>,
    pub fetched_at: Monotonic,
    pub last_error: Option<String>,
    pub protection_counters: ProtectionCounters,
    pub hit_count: u64,
    pub miss_count: u64,
    pub max_size_seen: usize,
}

impl CacheEntry {
    pub(crate) fn new(items: Vec<NewsItem>, fetched_at: Monotonic) -> Self {
        let size = items.len();
        Self {
            items,
            fetched_at,
            last_error: None,
            protection_counters: ProtectionCounters::default(),
            hit_count: 0,
            miss_count: 0,
            max_size_seen: size,
        }
    }

    /// Cardinality of `items` (§3.3 `size`).
    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn record_size(&mut self) {
        self.max_size_seen = self.max_size_seen.max(self.items.len());
    }
}

/// A read-only monitoring snapshot of a source's cache entry (§4.1 `Status`).
#[derive(Debug, Clone)]
pub struct CacheStatusSnapshot {
    pub size: usize,
    pub fetched_at: Monotonic,
    pub last_error: Option<String>,
    pub protection_counters: ProtectionCounters,
    pub hit_count: u64,
    pub miss_count: u64,
    pub max_size_seen: usize,
}

impl From<&CacheEntry> for CacheStatusSnapshot {
    fn from(entry: &CacheEntry) -> Self {
        Self {
            size: entry.size(),
            fetched_at: entry.fetched_at,
            last_error: entry.last_error.clone(),
            protection_counters: entry.protection_counters,
            hit_count: entry.hit_count,
            miss_count: entry.miss_count,
            max_size_seen: entry.max_size_seen,
        }
    }
}
