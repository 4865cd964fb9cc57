use std::sync::Mutex;

use async_trait::async_trait;
use heatlink_core::CallType;
use heatlink_stats::{Aggregate, SourceStatus, StatsOutcome, StatsSink, StatsSinkError};

/// One recorded `UpsertSourceStatus` call (§6.3).
#[derive(Debug, Clone)]
pub struct StatusUpsert {
    pub source_id: String,
    pub status: SourceStatus,
}

/// A [`StatsSink`] that records everything it's given in memory, for
/// engine-level and collector-level tests to assert against (§13).
#[derive(Default)]
pub struct RecordingStatsSink {
    outcomes: Mutex<Vec<StatsOutcome>>,
    aggregates: Mutex<Vec<(String, CallType, Aggregate)>>,
    statuses: Mutex<Vec<StatusUpsert>>,
}

impl RecordingStatsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> Vec<StatsOutcome> {
        self.outcomes.lock().unwrap().clone()
    }

    pub fn aggregates(&self) -> Vec<(String, CallType, Aggregate)> {
        self.aggregates.lock().unwrap().clone()
    }

    pub fn statuses(&self) -> Vec<StatusUpsert> {
        self.statuses.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatsSink for RecordingStatsSink {
    async fn append_stats_outcome(&self, row: &StatsOutcome) -> Result<(), StatsSinkError> {
        self.outcomes.lock().unwrap().push(row.clone());
        Ok(())
    }

    async fn upsert_aggregate(
        &self,
        source_id: &str,
        call_type: CallType,
        snapshot: &Aggregate,
    ) -> Result<(), StatsSinkError> {
        self.aggregates.lock().unwrap().push((source_id.to_string(), call_type, *snapshot));
        Ok(())
    }

    async fn upsert_source_status(&self, source_id: &str, status: &SourceStatus) -> Result<(), StatsSinkError> {
        self.statuses.lock().unwrap().push(StatusUpsert {
            source_id: source_id.to_string(),
            status: status.clone(),
        });
        Ok(())
    }
}
