use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use smol_str::SmolStr;

use crate::source_id::CanonicalSourceId;

/// A stable item identifier, derived or adapter-supplied (§3.1).
///
/// Two [`NewsItem`]s with equal `id` are considered the same item by every
/// downstream consumer — the emitter dedupes on this value.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ItemId(SmolStr);

impl ItemId {
    /// Wrap an adapter-supplied id verbatim.
    pub fn from_adapter(raw: impl Into<SmolStr>) -> Self {
        Self(raw.into())
    }

    /// Derive an id from the fields named in §3.1:
    /// `hex(sha1(source_id || "\x00" || url || "\x00" || published_at_rfc3339_or_empty || "\x00" || title))`.
    pub fn derive(
        source_id: &CanonicalSourceId,
        url: &str,
        published_at: Option<DateTime<Utc>>,
        title: &str,
    ) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(source_id.as_str().as_bytes());
        hasher.update(b"\x00");
        hasher.update(url.as_bytes());
        hasher.update(b"\x00");
        if let Some(ts) = published_at {
            hasher.update(ts.to_rfc3339().as_bytes());
        }
        hasher.update(b"\x00");
        hasher.update(title.as_bytes());
        let digest = hasher.finalize();
        Self(SmolStr::new(hex_encode(&digest)))
    }

    /// Borrow the id as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// The canonical trending-item record every adapter produces and every
/// downstream consumer receives (§3.1).
///
/// `source_id` and `source_name` are always top-level fields; the engine
/// strips any `extra["source_id"]`/`extra["source_name"]` an adapter
/// mistakenly sets (see [`NewsItem::normalize`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    /// Stable identifier, adapter-supplied or derived on ingest.
    pub id: ItemId,
    /// Canonical id of the source this item came from.
    pub source_id: CanonicalSourceId,
    /// Human-readable name of the source, e.g. `"Hacker News"`.
    pub source_name: String,
    /// Headline or title. Required.
    pub title: String,
    /// Absolute URL to the item. Required.
    pub url: String,
    /// The adapter's own local identifier for this item, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeSet<String>>,
    /// Adapter-specific overflow fields. Never contains `source_id` or
    /// `source_name` after [`NewsItem::normalize`] has run.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NewsItem {
    /// Start building a `NewsItem` for `source_id`/`source_name`.
    pub fn builder(
        source_id: CanonicalSourceId,
        source_name: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> NewsItemBuilder {
        NewsItemBuilder::new(source_id, source_name, title, url)
    }

    /// Enforce the §3.1 invariants the engine is responsible for on ingest:
    /// `source_id`/`source_name` never rely on `extra`, `extra` never
    /// carries them either, and `id` is derived when the adapter didn't
    /// supply one.
    ///
    /// Returns whether normalization changed anything observable (used by
    /// callers that want to log/trace a correction).
    pub fn normalize(&mut self, canonical_source_id: &CanonicalSourceId, source_name: &str) -> bool {
        let mut changed = false;

        if self.source_id.as_str() != canonical_source_id.as_str() {
            self.source_id = canonical_source_id.clone();
            changed = true;
        }
        if self.source_name.is_empty() {
            self.source_name = source_name.to_string();
            changed = true;
        }

        for stray in ["source_id", "source_name"] {
            if self.extra.remove(stray).is_some() {
                changed = true;
            }
        }

        if self.id.as_str().is_empty() {
            self.id = ItemId::derive(
                &self.source_id,
                &self.url,
                self.published_at,
                &self.title,
            );
            changed = true;
        }

        changed
    }
}

/// Incremental builder for [`NewsItem`], mirroring the adapter-facing
/// construction style (required fields up front, everything else fluent).
pub struct NewsItemBuilder {
    item: NewsItem,
}

impl NewsItemBuilder {
    fn new(
        source_id: CanonicalSourceId,
        source_name: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            item: NewsItem {
                id: ItemId(SmolStr::new("")),
                source_id,
                source_name: source_name.into(),
                title: title.into(),
                url: url.into(),
                original_id: None,
                summary: None,
                content: None,
                author: None,
                image_url: None,
                published_at: None,
                updated_at: None,
                language: None,
                country: None,
                category: None,
                tags: None,
                extra: serde_json::Map::new(),
            },
        }
    }

    /// Use an adapter-supplied id instead of letting the engine derive one.
    pub fn id(mut self, id: impl Into<SmolStr>) -> Self {
        self.item.id = ItemId::from_adapter(id);
        self
    }

    pub fn original_id(mut self, id: impl Into<String>) -> Self {
        self.item.original_id = Some(id.into());
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.item.summary = Some(summary.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.item.content = Some(content.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.item.author = Some(author.into());
        self
    }

    pub fn image_url(mut self, image_url: impl Into<String>) -> Self {
        self.item.image_url = Some(image_url.into());
        self
    }

    pub fn published_at(mut self, ts: DateTime<Utc>) -> Self {
        self.item.published_at = Some(ts);
        self
    }

    pub fn updated_at(mut self, ts: DateTime<Utc>) -> Self {
        self.item.updated_at = Some(ts);
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.item.language = Some(language.into());
        self
    }

    pub fn country(mut self, country: impl Into<String>) -> Self {
        self.item.country = Some(country.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.item.category = Some(category.into());
        self
    }

    pub fn tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.item.tags = Some(tags.into_iter().collect());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.item.extra.insert(key.into(), value);
        self
    }

    /// Finish building. If no explicit id was set, `build` derives one per
    /// §3.1 using the fields gathered so far.
    pub fn build(mut self) -> NewsItem {
        if self.item.id.as_str().is_empty() {
            self.item.id = ItemId::derive(
                &self.item.source_id,
                &self.item.url,
                self.item.published_at,
                &self.item.title,
            );
        }
        self.item
    }
}
