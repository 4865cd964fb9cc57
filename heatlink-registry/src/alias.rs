use std::collections::HashMap;

use heatlink_core::CanonicalSourceId;

/// Maps legacy catalog names to their current canonical source id (§9/§14).
///
/// Plain underscore/whitespace synonyms are already handled by
/// [`CanonicalSourceId::canonicalize`]; this table exists for the smaller
/// set of renames that aren't expressible as a separator rewrite, e.g. a
/// source that changed its `source_id` entirely when it moved domains.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<CanonicalSourceId, CanonicalSourceId>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `alias` as resolving to `canonical`. Both sides are run
    /// through [`CanonicalSourceId::canonicalize`] first, so callers can
    /// pass raw catalog strings directly.
    pub fn insert(&mut self, alias: impl AsRef<str>, canonical: impl AsRef<str>) {
        self.aliases.insert(
            CanonicalSourceId::canonicalize(alias.as_ref()),
            CanonicalSourceId::canonicalize(canonical.as_ref()),
        );
    }

    /// Resolves `raw` to its canonical id: first through the alias table,
    /// falling back to plain canonicalization when no alias matches.
    pub fn resolve(&self, raw: &str) -> CanonicalSourceId {
        let candidate = CanonicalSourceId::canonicalize(raw);
        match self.aliases.get(&candidate) {
            Some(canonical) => canonical.clone(),
            None => candidate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unaliased_id_canonicalizes_normally() {
        let table = AliasTable::new();
        assert_eq!(table.resolve("Hacker_News").as_str(), "hacker-news");
    }

    #[test]
    fn aliased_legacy_name_resolves_to_current_id() {
        let mut table = AliasTable::new();
        table.insert("techcrunch-old", "techcrunch");
        assert_eq!(table.resolve("TechCrunch_Old").as_str(), "techcrunch");
    }
}
