//! Canonical source identifiers.
//!
//! HeatLink's catalog accumulated both hyphen- and underscore-separated
//! source ids over time. The canonical form uses hyphens only; every other
//! form is rewritten to it at the registry boundary so that cache keys,
//! stats keys, and emitter calls never see a synonym.

use smol_str::SmolStr;
use std::fmt;

/// A `source_id` that has been rewritten into canonical (hyphen, lowercase
/// ASCII) form.
///
/// Construction always succeeds: any input is lowercased and has runs of
/// `_`/whitespace collapsed to single hyphens. What `CanonicalSourceId`
/// guarantees is *shape*, not that the id is registered — that is the
/// registry's job.
#[derive(Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct CanonicalSourceId(SmolStr);

impl CanonicalSourceId {
    /// Canonicalizes `raw` into hyphen form.
    ///
    /// ```
    /// use heatlink_core::CanonicalSourceId;
    ///
    /// assert_eq!(CanonicalSourceId::canonicalize("Hacker_News").as_str(), "hacker-news");
    /// assert_eq!(CanonicalSourceId::canonicalize("hacker-news").as_str(), "hacker-news");
    /// assert_eq!(CanonicalSourceId::canonicalize("  weird__id ").as_str(), "weird-id");
    /// ```
    pub fn canonicalize(raw: &str) -> Self {
        let mut out = String::with_capacity(raw.len());
        let mut last_was_sep = false;
        for ch in raw.trim().chars() {
            if ch == '_' || ch == '-' || ch.is_whitespace() {
                if !out.is_empty() && !last_was_sep {
                    out.push('-');
                }
                last_was_sep = true;
            } else {
                out.extend(ch.to_lowercase());
                last_was_sep = false;
            }
        }
        while out.ends_with('-') {
            out.pop();
        }
        Self(SmolStr::new(out))
    }

    /// Borrows the canonical string form.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Renders the shared-cache item key for this source: `source:{sid}`.
    pub fn cache_key(&self) -> String {
        format!("source:{}", self.0)
    }

    /// Renders the shared-cache stats-snapshot key: `source:{sid}:stats`.
    pub fn stats_cache_key(&self) -> String {
        format!("source:{}:stats", self.0)
    }
}

impl fmt::Display for CanonicalSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CanonicalSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalSourceId({})", self.0)
    }
}

impl From<&str> for CanonicalSourceId {
    fn from(raw: &str) -> Self {
        Self::canonicalize(raw)
    }
}

impl From<String> for CanonicalSourceId {
    fn from(raw: String) -> Self {
        Self::canonicalize(&raw)
    }
}

impl AsRef<str> for CanonicalSourceId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl serde::Serialize for CanonicalSourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for CanonicalSourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::canonicalize(&raw))
    }
}
