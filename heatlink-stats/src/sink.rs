use async_trait::async_trait;
use heatlink_core::CallType;

use crate::aggregate::Aggregate;
use crate::outcome::StatsOutcome;

/// Per-source status row, upserted on every flush (§6.3).
#[derive(Debug, Clone)]
pub struct SourceStatus {
    pub status: SourceStatusKind,
    pub last_error: Option<String>,
    pub last_update: chrono::DateTime<chrono::Utc>,
    pub item_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceStatusKind {
    Ok,
    Degraded,
    Failing,
}

/// Persistence boundary for fetch outcomes and aggregates (§6.3).
///
/// The engine never depends on a concrete store; relational, time-series or
/// in-memory implementations all satisfy this the same way a cache backend
/// satisfies [`heatlink_cache::SharedCache`].
#[async_trait]
pub trait StatsSink: Send + Sync {
    async fn append_stats_outcome(&self, row: &StatsOutcome) -> Result<(), StatsSinkError>;

    async fn upsert_aggregate(
        &self,
        source_id: &str,
        call_type: CallType,
        snapshot: &Aggregate,
    ) -> Result<(), StatsSinkError>;

    async fn upsert_source_status(
        &self,
        source_id: &str,
        status: &SourceStatus,
    ) -> Result<(), StatsSinkError>;
}

#[derive(Debug, thiserror::Error)]
#[error("stats sink error: {0}")]
pub struct StatsSinkError(pub String);
