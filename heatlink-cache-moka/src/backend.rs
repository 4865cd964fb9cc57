use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use heatlink_cache::{SharedCache, SharedCacheError};
use moka::future::Cache;

/// [`SharedCache`] backed by a Moka in-memory cache.
///
/// Entries carry per-insert TTL via [`Cache::insert`] combined with a
/// per-entry expiry; Moka evicts lazily on subsequent access plus a
/// periodic housekeeping pass, so an expired key may briefly still occupy
/// memory but is never returned to a caller.
#[derive(Clone)]
pub struct MokaSharedCache {
    cache: Cache<String, (Bytes, std::time::Instant, Duration)>,
}

impl MokaSharedCache {
    /// Build a cache capped at `max_capacity` entries.
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(Expiry)
                .build(),
        }
    }

    /// Approximate entry count, useful in tests after
    /// `run_pending_tasks()`.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Force Moka's background eviction to run synchronously (test-only
    /// ergonomics, mirroring the teacher's moka backend).
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

#[derive(Clone, Copy)]
struct Expiry;

impl moka::Expiry<String, (Bytes, std::time::Instant, Duration)> for Expiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &(Bytes, std::time::Instant, Duration),
        _created_at: std::time::Instant,
    ) -> Option<Duration> {
        Some(value.2)
    }
}

#[async_trait]
impl SharedCache for MokaSharedCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, SharedCacheError> {
        Ok(self.cache.get(key).await.map(|(bytes, _, _)| bytes))
    }

    async fn set(&self, key: &str, value: Bytes, ttl_ms: u64) -> Result<(), SharedCacheError> {
        let ttl = Duration::from_millis(ttl_ms);
        self.cache
            .insert(key.to_string(), (value, std::time::Instant::now(), ttl))
            .await;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), SharedCacheError> {
        self.cache.remove(key).await;
        Ok(())
    }
}
