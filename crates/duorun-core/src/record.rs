//! Execution records and the aggregate summaries computed over them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{RecordId, Stage, WorkerId};

/// One worker invocation, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    /// Unique record identifier.
    pub id: RecordId,
    /// Worker that was invoked.
    pub worker_id: WorkerId,
    /// Pipeline stage of the invocation.
    pub stage: Stage,
    /// Role directive the worker was given.
    pub role: String,
    /// Capability category of the task.
    pub category: String,
    /// Whether the invocation produced output.
    pub success: bool,
    /// Wall-clock latency of the invocation.
    pub latency_ms: u64,
    /// Input plus output tokens reported by the adapter.
    pub tokens_used: u64,
    /// Estimated cost from the worker's blended rate.
    pub cost_estimate: f64,
    /// When the invocation finished.
    pub timestamp: DateTime<Utc>,
    /// Failure description for unsuccessful invocations.
    pub error: Option<String>,
}

impl ExecutionRecord {
    /// Record a successful invocation.
    pub fn succeeded(
        worker_id: WorkerId,
        stage: Stage,
        role: impl Into<String>,
        category: impl Into<String>,
        latency_ms: u64,
        tokens_used: u64,
        cost_estimate: f64,
    ) -> Self {
        Self {
            id: RecordId::generate(),
            worker_id,
            stage,
            role: role.into(),
            category: category.into(),
            success: true,
            latency_ms,
            tokens_used,
            cost_estimate,
            timestamp: Utc::now(),
            error: None,
        }
    }

    /// Record a failed invocation (error, timeout or cancellation).
    pub fn failed(
        worker_id: WorkerId,
        stage: Stage,
        role: impl Into<String>,
        category: impl Into<String>,
        latency_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::generate(),
            worker_id,
            stage,
            role: role.into(),
            category: category.into(),
            success: false,
            latency_ms,
            tokens_used: 0,
            cost_estimate: 0.0,
            timestamp: Utc::now(),
            error: Some(error.into()),
        }
    }

    /// Builder method to override the timestamp (useful for testing).
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// Half-open time range `[start, end)`; an open bound is unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Window covering every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// Window covering the trailing `duration` up to now.
    pub fn last(duration: Duration) -> Self {
        Self {
            start: Some(Utc::now() - duration),
            end: None,
        }
    }

    /// Window between two instants.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Check whether an instant falls inside the window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at < end)
    }
}

/// Aggregate performance of a worker over a window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub avg_latency_ms: f64,
    pub avg_tokens: f64,
    /// Fraction of successful invocations in [0, 1]; 0 with no requests.
    pub success_rate: f64,
    pub total_cost_estimate: f64,
}

impl PerformanceSummary {
    /// Aggregate the given records. Pure; the records are not modified.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ExecutionRecord>) -> Self {
        let mut total = 0u64;
        let mut successes = 0u64;
        let mut latency_sum = 0u128;
        let mut token_sum = 0u128;
        let mut cost = 0.0;

        for record in records {
            total += 1;
            if record.success {
                successes += 1;
            }
            latency_sum += u128::from(record.latency_ms);
            token_sum += u128::from(record.tokens_used);
            cost += record.cost_estimate;
        }

        if total == 0 {
            return Self::default();
        }

        let n = total as f64;
        Self {
            total_requests: total,
            successful_requests: successes,
            avg_latency_ms: latency_sum as f64 / n,
            avg_tokens: token_sum as f64 / n,
            success_rate: successes as f64 / n,
            total_cost_estimate: cost,
        }
    }
}
