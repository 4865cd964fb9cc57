use async_trait::async_trait;
use bytes::Bytes;
use heatlink_cache::{SharedCache, SharedCacheError};
use redis::{AsyncCommands, Client};
use tokio::sync::OnceCell;
use tracing::trace;

use crate::error::Error;

/// [`SharedCache`] backed by Redis, using a lazily-established, multiplexed
/// [`redis::aio::ConnectionManager`] so concurrent callers share one
/// connection instead of opening one per operation.
#[derive(Clone)]
pub struct RedisSharedCache {
    client: Client,
    connection: OnceCell<redis::aio::ConnectionManager>,
}

impl RedisSharedCache {
    /// Build a backend pointed at `url` (e.g. `redis://127.0.0.1:6379/`).
    /// The connection itself is established lazily on first use.
    pub fn new(url: impl AsRef<str>) -> Result<Self, Error> {
        let client = Client::open(url.as_ref())?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<redis::aio::ConnectionManager, Error> {
        let conn = self
            .connection
            .get_or_try_init(|| async { self.client.get_connection_manager().await.map_err(Error::from) })
            .await?;
        Ok(conn.clone())
    }
}

#[async_trait]
impl SharedCache for RedisSharedCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, SharedCacheError> {
        let mut conn = self.connection().await.map_err(SharedCacheError::from)?;
        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| SharedCacheError::from(Error::from(e)))?;
        trace!(key, hit = value.is_some(), "redis shared cache read");
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl_ms: u64) -> Result<(), SharedCacheError> {
        let mut conn = self.connection().await.map_err(SharedCacheError::from)?;
        let ttl_secs = ttl_ms.div_ceil(1000).max(1);
        let _: () = conn
            .set_ex(key, value.as_ref(), ttl_secs)
            .await
            .map_err(|e| SharedCacheError::from(Error::from(e)))?;
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), SharedCacheError> {
        let mut conn = self.connection().await.map_err(SharedCacheError::from)?;
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| SharedCacheError::from(Error::from(e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_fails_fast() {
        assert!(RedisSharedCache::new("not-a-url").is_err());
    }
}
