//! Core data model shared by every HeatLink fetch-engine crate.
//!
//! This crate has no knowledge of caching, proxying, scheduling or HTTP — it
//! only defines the shapes that flow between those components: the
//! [`NewsItem`] record adapters emit, the [`SourceDescriptor`] that
//! configures a source, the [`CanonicalSourceId`] normalization rule, and the
//! stable [`ErrorKind`] taxonomy used across the engine.

mod call_type;
mod error;
mod item;
mod source_id;
mod source;
#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use call_type::CallType;
pub use error::ErrorKind;
pub use item::{ItemId, NewsItem, NewsItemBuilder};
pub use source_id::CanonicalSourceId;
pub use source::{ProxyPolicy, SourceDescriptor, SourceDescriptorError, SourceKind};

/// Maximum number of items the engine will keep per source on ingest (§5).
pub const MAX_ITEMS_PER_SOURCE: usize = 500;
