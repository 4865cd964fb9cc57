use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Error surfaced by a [`SharedCache`] implementation.
///
/// Shared-cache failures never block a fetch: the engine logs them and
/// falls back to treating the read/write as a miss/no-op (§4.1).
#[derive(Debug, Error)]
pub enum SharedCacheError {
    #[error("shared cache connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("shared cache codec error: {0}")]
    Codec(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Second-tier, cross-process key→bytes cache with TTL (§4.1, §6.2).
///
/// Implemented by `heatlink-cache-moka` (in-process) and
/// `heatlink-cache-redis` (cross-process). The engine never treats a
/// `SharedCache` as authoritative for protection decisions — it is
/// consulted only on a cold in-memory cache, and written to only after a
/// successful in-memory `Update`.
#[async_trait]
pub trait SharedCache: Send + Sync {
    /// Fetch raw bytes for `key`. `Ok(None)` means a miss (or expired).
    async fn get(&self, key: &str) -> Result<Option<Bytes>, SharedCacheError>;

    /// Store `value` under `key` with the given TTL.
    async fn set(&self, key: &str, value: Bytes, ttl_ms: u64) -> Result<(), SharedCacheError>;

    /// Remove `key`, if present.
    async fn del(&self, key: &str) -> Result<(), SharedCacheError>;
}

#[async_trait]
impl SharedCache for std::sync::Arc<dyn SharedCache> {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, SharedCacheError> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: Bytes, ttl_ms: u64) -> Result<(), SharedCacheError> {
        (**self).set(key, value, ttl_ms).await
    }

    async fn del(&self, key: &str) -> Result<(), SharedCacheError> {
        (**self).del(key).await
    }
}
