//! Cross-process [`SharedCache`](heatlink_cache::SharedCache) tier backed
//! by Redis, for multi-process HeatLink deployments.

mod backend;
mod error;

pub use backend::RedisSharedCache;
pub use error::Error;
