use heatlink_cache::SharedCacheError;

/// Error type for the Redis shared-cache backend.
///
/// Wraps errors from the underlying [`redis`] crate. Converts into
/// [`SharedCacheError`] for uniform handling by `heatlink-cache` callers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

impl From<Error> for SharedCacheError {
    fn from(error: Error) -> Self {
        match error {
            Error::Redis(e) => SharedCacheError::Connection(Box::new(e)),
        }
    }
}
