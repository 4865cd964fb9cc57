//! Per-source protected cache (§4.1) plus the shared-cache tier contract.
//!
//! [`CacheLayer`] is the engine's source of truth: it decides, on every
//! fetch outcome, whether to commit an adapter's freshly fetched items or
//! to protect the existing entry from an empty/thin/errored response. A
//! [`SharedCache`] is optional second tier (Moka or Redis, see the sibling
//! `heatlink-cache-moka`/`heatlink-cache-redis` crates) consulted only on a
//! cold in-memory cache; it never participates in protection decisions.

mod entry;
mod layer;
mod protection;
mod shared;

pub use entry::{CacheEntry, CacheStatusSnapshot, ProtectionCounters};
pub use layer::{CacheLayer, LookupResult, UpdateOutcome, UpdateResult};
pub use protection::{protect, ProtectionDecision, ProtectionKind};
pub use shared::{SharedCache, SharedCacheError};
