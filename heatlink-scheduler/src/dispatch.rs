use async_trait::async_trait;
use heatlink_core::CanonicalSourceId;

/// What happened when the scheduler handed a due source to the Fetch
/// Engine (§4.6, §4.9).
#[derive(Debug, Clone, Copy)]
pub enum DispatchOutcome {
    /// The fetch ran to completion (success or failure).
    Completed {
        success: bool,
        duration_ms: u64,
        /// Items not previously present in the cache. Only meaningful when
        /// `success` is true.
        new_item_count: u64,
    },
    /// The source's single-flight guard was already held by another caller;
    /// the scheduler must not advance `next_due_at` for this tick (§4.6).
    Skipped,
}

/// How the scheduler hands a due source to the Fetch Engine.
///
/// Implemented by `heatlink-engine`'s fetch engine, which owns the
/// single-flight guard, the registry and the cache the scheduler itself has
/// no knowledge of.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, source_id: CanonicalSourceId) -> DispatchOutcome;
}
