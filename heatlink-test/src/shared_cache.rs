use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use heatlink_cache::{SharedCache, SharedCacheError};

/// A bare in-memory [`SharedCache`] double with no real expiry — every
/// `set` is remembered until the matching `del`, regardless of the TTL it
/// was given (§13). Engine tests that need TTL-accurate shared-cache
/// behavior should use `heatlink-cache-moka` instead; this exists purely
/// so cold-start shared-cache reads can be asserted against without
/// standing up Moka or Redis.
#[derive(Default)]
pub struct InMemorySharedCache {
    entries: Mutex<HashMap<String, Bytes>>,
}

impl InMemorySharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

#[async_trait]
impl SharedCache for InMemorySharedCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, SharedCacheError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Bytes, _ttl_ms: u64) -> Result<(), SharedCacheError> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), SharedCacheError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}
