use std::sync::Arc;

use async_trait::async_trait;
use heatlink_core::{NewsItem, SourceDescriptor};
use heatlink_registry::{Adapter, AdapterError, FetchContext};
use tracing::debug;

/// Wraps a registry-resolved adapter so every `fetch` call is visible in a
/// span, mirroring the corpus's replacement for a monkey-patched stats
/// wrapper (§9): rather than rebinding `fetch` at runtime, the engine
/// wraps the trait object once, at resolution time.
///
/// The authoritative [`heatlink_stats::StatsOutcome`] for a fetch is
/// recorded by the engine itself after the cache commit (§4.7 step 7),
/// using `committed_items` rather than the adapter's raw result — so this
/// shim does not write to the collector directly. Its job is purely the
/// tracing/observability echo of the "every fetch is wrapped" idiom.
pub struct StatsRecordingAdapter {
    inner: Arc<dyn Adapter>,
}

impl StatsRecordingAdapter {
    pub fn wrap(inner: Arc<dyn Adapter>) -> Arc<dyn Adapter> {
        Arc::new(Self { inner })
    }
}

#[async_trait]
impl Adapter for StatsRecordingAdapter {
    fn metadata(&self) -> &SourceDescriptor {
        self.inner.metadata()
    }

    async fn fetch(&self, ctx: &FetchContext, client: &reqwest::Client) -> Result<Vec<NewsItem>, AdapterError> {
        let source_id = self.inner.metadata().source_id().clone();
        debug!(%source_id, call_type = %ctx.call_type, "adapter fetch starting");
        let result = self.inner.fetch(ctx, client).await;
        match &result {
            Ok(items) => debug!(%source_id, count = items.len(), "adapter fetch completed"),
            Err(err) => debug!(%source_id, error_kind = %err.kind(), "adapter fetch failed"),
        }
        result
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}
