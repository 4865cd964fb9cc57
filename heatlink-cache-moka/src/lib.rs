//! In-process [`SharedCache`](heatlink_cache::SharedCache) tier backed by
//! Moka, for single-process deployments or tests that want a real TTL
//! without standing up Redis.

mod backend;

pub use backend::MokaSharedCache;
