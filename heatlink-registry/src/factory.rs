use std::collections::HashMap;
use std::sync::Arc;

use heatlink_core::{SourceDescriptor, SourceKind};

use crate::adapter::Adapter;
use crate::error::RegistryError;

/// Builds a concrete [`Adapter`] instance from a [`SourceDescriptor`]
/// (§4.4). Constructors are fallible since a descriptor's `config` blob is
/// only validated once the adapter for its `kind` tries to parse it.
pub type AdapterConstructor =
    Arc<dyn Fn(SourceDescriptor) -> Result<Arc<dyn Adapter>, RegistryError> + Send + Sync>;

/// Dispatches descriptor-to-adapter construction by [`SourceKind`] (§4.4).
///
/// The engine wires one constructor per kind at startup — JSON API, RSS,
/// rendered HTML — but nothing here hardcodes those three; any kind with a
/// registered constructor is buildable.
#[derive(Clone, Default)]
pub struct AdapterFactory {
    constructors: HashMap<SourceKind, AdapterConstructor>,
}

impl AdapterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the constructor used for every descriptor of `kind`.
    /// A later call for the same kind replaces the earlier one.
    pub fn register_kind(&mut self, kind: SourceKind, constructor: AdapterConstructor) {
        self.constructors.insert(kind, constructor);
    }

    /// Builds the adapter for `descriptor` using the constructor registered
    /// for its `kind`.
    pub fn instantiate(&self, descriptor: SourceDescriptor) -> Result<Arc<dyn Adapter>, RegistryError> {
        let kind = descriptor.kind;
        match self.constructors.get(&kind) {
            Some(constructor) => constructor(descriptor),
            None => Err(RegistryError::UnsupportedKind(kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::FetchContext;
    use async_trait::async_trait;
    use heatlink_core::NewsItem;

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

    fn descriptor(kind: SourceKind) -> SourceDescriptor {
        SourceDescriptor::new("demo", "Demo", "https://demo", kind, 60_000, 30_000).unwrap()
    }

    #[test]
    fn instantiate_dispatches_by_kind() {
        let mut factory = AdapterFactory::new();
        factory.register_kind(
            SourceKind::Api,
            Arc::new(|d| Ok(Arc::new(StubAdapter(d)) as Arc<dyn Adapter>)),
        );

        let adapter = factory.instantiate(descriptor(SourceKind::Api)).unwrap();
        assert_eq!(adapter.metadata().kind, SourceKind::Api);
    }

    #[test]
    fn instantiate_fails_for_unregistered_kind() {
        let factory = AdapterFactory::new();
        let err = factory.instantiate(descriptor(SourceKind::Rss)).unwrap_err();
        assert_eq!(err, RegistryError::UnsupportedKind(SourceKind::Rss));
    }
}
