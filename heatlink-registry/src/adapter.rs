use async_trait::async_trait;
use heatlink_core::{CallType, NewsItem, SourceDescriptor};

/// Per-fetch context handed to [`Adapter::fetch`] (§4.3, §6.1).
///
/// `deadline_ms` is the millisecond budget remaining at the moment the
/// adapter was invoked, already reduced to the minimum of the caller's
/// deadline, the source's `fetch_deadline_ms`, and any global shutdown
/// signal (§5). Adapters doing their own internal pagination should stop
/// once this budget is spent rather than relying solely on the HTTP
/// client's own timeout.
#[derive(Debug, Clone, Copy)]
pub struct FetchContext {
    pub deadline_ms: u64,
    pub call_type: CallType,
}

/// The pluggable interface every source satisfies (§4.4, §6.1).
///
/// Adapters MUST NOT open their own sockets — the engine provides a
/// preconfigured [`reqwest::Client`] via the HTTP Client Factory, already
/// carrying proxy, timeout and redirect policy.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// The adapter's static configuration (§3.2). Implementations
    /// typically store this at construction time and return a reference.
    fn metadata(&self) -> &SourceDescriptor;

    /// Fetch this source's current items.
    async fn fetch(
        &self,
        ctx: &FetchContext,
        client: &reqwest::Client,
    ) -> Result<Vec<NewsItem>, crate::error::AdapterError>;

    /// Release any external handles (headless browser sessions, open
    /// files). Most adapters need no cleanup.
    async fn close(&self) {}
}
