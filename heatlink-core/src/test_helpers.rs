//! Convenience constructors used by `heatlink-test` and by other crates'
//! own test modules. Gated behind the `test-helpers` feature so none of
//! this ships in a production build.

use crate::{NewsItem, SourceDescriptor, SourceKind};

/// A `SourceDescriptor` with the minimum valid intervals (§3.2), suitable
/// for most unit tests that don't care about scheduling cadence.
pub fn quick_descriptor(source_id: &str) -> SourceDescriptor {
    SourceDescriptor::new(
        source_id,
        source_id,
        format!("https://example.test/{source_id}"),
        SourceKind::Api,
        60_000,
        30_000,
    )
    .expect("quick_descriptor always builds a valid descriptor")
}

/// A minimally populated `NewsItem` for `source_id`, with a derived id.
pub fn quick_item(source_id: &str, title: &str) -> NewsItem {
    let canonical = crate::CanonicalSourceId::canonicalize(source_id);
    NewsItem::builder(
        canonical,
        source_id,
        title,
        format!("https://example.test/{source_id}/{title}"),
    )
    .build()
}
