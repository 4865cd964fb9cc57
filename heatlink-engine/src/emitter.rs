use async_trait::async_trait;
use heatlink_core::{CallType, CanonicalSourceId, NewsItem};
use thiserror::Error;

/// Error surfaced by a [`DownstreamEmitter`]. Never rolls back a cache
/// update (§6.4, §7) — the engine logs it and moves on.
#[derive(Debug, Error)]
#[error("downstream emit failed: {0}")]
pub struct EmitError(pub String);

/// `Emit(source_id, items, call_type)` (§6.4): the engine's only outbound
/// publish of committed items to whatever durable store consumes them.
///
/// Implementations are expected to dedupe by [`heatlink_core::ItemId`] and
/// persist; the engine waits for an ack only up to a short bounded window
/// (`EngineConfig::emit_ack_timeout_ms`, default 5s) and does not treat a
/// timeout or error as a reason to undo the cache commit that already
/// happened.
#[async_trait]
pub trait DownstreamEmitter: Send + Sync {
    async fn emit(&self, source_id: &CanonicalSourceId, items: &[NewsItem], call_type: CallType) -> Result<(), EmitError>;
}

/// A [`DownstreamEmitter`] that discards everything. Useful as a default
/// when a deployment has no downstream sink wired up yet, and in tests
/// that don't care about emission.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEmitter;

#[async_trait]
impl DownstreamEmitter for NullEmitter {
    async fn emit(&self, _source_id: &CanonicalSourceId, _items: &[NewsItem], _call_type: CallType) -> Result<(), EmitError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_emitter_always_succeeds() {
        let emitter = NullEmitter;
        let sid = CanonicalSourceId::canonicalize("demo");
        assert!(emitter.emit(&sid, &[], CallType::Internal).await.is_ok());
    }
}
