use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use heatlink_core::CanonicalSourceId;
use tracing::debug;

use crate::adapter::Adapter;
use crate::alias::AliasTable;
use crate::error::RegistryError;

/// Holds one live [`Adapter`] per canonical source id (§4.4, §9).
///
/// Lookup and registration both go through [`AliasTable::resolve`] first,
/// so a caller using a legacy name or an underscore synonym always lands on
/// the same entry as one using the current canonical id — registering the
/// same canonical source twice is still an error, whichever spelling was
/// used for each attempt.
pub struct Registry {
    adapters: DashMap<CanonicalSourceId, Arc<dyn Adapter>>,
    aliases: AliasTable,
}

impl Registry {
    pub fn new(aliases: AliasTable) -> Self {
        Self {
            adapters: DashMap::new(),
            aliases,
        }
    }

    /// Registers `adapter` under its descriptor's canonical source id.
    /// Errors if that id already has an adapter registered.
    pub fn register(&self, adapter: Arc<dyn Adapter>) -> Result<(), RegistryError> {
        let source_id = self.aliases.resolve(adapter.metadata().source_id().as_str());
        match self.adapters.entry(source_id.clone()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateSource(source_id)),
            Entry::Vacant(slot) => {
                debug!(source_id = %source_id, "registered adapter");
                slot.insert(adapter);
                Ok(())
            }
        }
    }

    /// Removes the adapter registered for `source_id`, if any. Returns
    /// `true` if an entry was removed.
    pub fn deregister(&self, source_id: &str) -> bool {
        let canonical = self.aliases.resolve(source_id);
        self.adapters.remove(&canonical).is_some()
    }

    /// Resolves `raw` (a canonical id, legacy alias, or underscore synonym)
    /// to its registered adapter.
    pub fn get(&self, raw: &str) -> Option<Arc<dyn Adapter>> {
        let canonical = self.aliases.resolve(raw);
        self.adapters.get(&canonical).map(|entry| Arc::clone(entry.value()))
    }

    /// Looks up by an already-canonicalized id, skipping alias resolution.
    pub fn get_canonical(&self, source_id: &CanonicalSourceId) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(source_id).map(|entry| Arc::clone(entry.value()))
    }

    /// All currently-registered canonical source ids, in no particular
    /// order.
    pub fn list(&self) -> Vec<CanonicalSourceId> {
        self.adapters.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::FetchContext;
    use async_trait::async_trait;
    use heatlink_core::{NewsItem, SourceDescriptor, SourceKind};

    struct StubAdapter(SourceDescriptor);

    #[async_trait]
    impl Adapter for StubAdapter {
        fn metadata(&self) -> &SourceDescriptor {
            &self.0
        }

        async fn fetch(
            &self,
            _ctx: &FetchContext,
            _client: &reqwest::Client,
        ) -> Result<Vec<NewsItem>, crate::error::AdapterError> {
            Ok(Vec::new())
        }
    }

    fn adapter(source_id: &str) -> Arc<dyn Adapter> {
        Arc::new(StubAdapter(
            SourceDescriptor::new(source_id, "Demo", "https://demo", SourceKind::Api, 60_000, 30_000)
                .unwrap(),
        ))
    }

    #[test]
    fn registering_same_source_twice_is_an_error() {
        let registry = Registry::new(AliasTable::new());
        registry.register(adapter("hacker-news")).unwrap();
        let err = registry.register(adapter("hacker-news")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateSource(CanonicalSourceId::canonicalize("hacker-news")));
    }

    #[test]
    fn underscore_synonym_resolves_to_same_registered_entry() {
        let registry = Registry::new(AliasTable::new());
        registry.register(adapter("hacker-news")).unwrap();

        assert!(registry.get("hacker_news").is_some());
        assert!(registry.get("Hacker News").is_some());

        let err = registry.register(adapter("hacker_news")).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateSource(CanonicalSourceId::canonicalize("hacker-news")));
    }

    #[test]
    fn deregister_removes_entry() {
        let registry = Registry::new(AliasTable::new());
        registry.register(adapter("demo")).unwrap();
        assert!(registry.deregister("demo"));
        assert!(registry.get("demo").is_none());
        assert!(!registry.deregister("demo"));
    }

    #[test]
    fn alias_table_consulted_before_registration_lookup() {
        let mut aliases = AliasTable::new();
        aliases.insert("old-name", "demo");
        let registry = Registry::new(aliases);
        registry.register(adapter("demo")).unwrap();

        assert!(registry.get("old-name").is_some());
    }

    #[test]
    fn list_returns_all_canonical_ids() {
        let registry = Registry::new(AliasTable::new());
        registry.register(adapter("a")).unwrap();
        registry.register(adapter("b")).unwrap();
        let mut ids: Vec<String> = registry.list().iter().map(|s| s.as_str().to_string()).collect();
        ids.sort();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }
}
