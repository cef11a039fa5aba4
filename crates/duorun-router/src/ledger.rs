//! Append-only log of worker invocations and the reports computed over it.

use std::collections::BTreeMap;

use duorun_core::{ExecutionRecord, PerformanceSummary, TimeWindow, WorkerId};
use tokio::sync::RwLock;
use tracing::debug;

/// Shared, append-only execution log.
///
/// Records are never modified or removed; retention is an external concern.
#[derive(Debug, Default)]
pub struct PerformanceLedger {
    records: RwLock<Vec<ExecutionRecord>>,
}

impl PerformanceLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub async fn append(&self, record: ExecutionRecord) {
        debug!(
            worker_id = %record.worker_id,
            stage = %record.stage,
            success = record.success,
            latency_ms = record.latency_ms,
            "Recording execution"
        );
        self.records.write().await.push(record);
    }

    /// Summarise a worker's records inside a window, optionally restricted
    /// to one capability category.
    pub async fn report(
        &self,
        worker_id: &WorkerId,
        category: Option<&str>,
        window: TimeWindow,
    ) -> PerformanceSummary {
        let records = self.records.read().await;
        PerformanceSummary::from_records(records.iter().filter(|record| {
            &record.worker_id == worker_id
                && category.map_or(true, |c| record.category == c)
                && window.contains(record.timestamp)
        }))
    }

    /// Summarise every worker that has records inside the window.
    pub async fn report_all(&self, window: TimeWindow) -> BTreeMap<WorkerId, PerformanceSummary> {
        let records = self.records.read().await;
        let mut by_worker: BTreeMap<WorkerId, Vec<&ExecutionRecord>> = BTreeMap::new();
        for record in records
            .iter()
            .filter(|record| window.contains(record.timestamp))
        {
            by_worker
                .entry(record.worker_id.clone())
                .or_default()
                .push(record);
        }
        by_worker
            .into_iter()
            .map(|(worker_id, records)| {
                (
                    worker_id,
                    PerformanceSummary::from_records(records.into_iter()),
                )
            })
            .collect()
    }

    /// Snapshot of every record, oldest first.
    pub async fn records(&self) -> Vec<ExecutionRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
