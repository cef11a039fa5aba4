//! Worker profile: the catalog entry describing one model backend.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{CapabilityTag, CoreError, WorkerId};

/// Highest capability score a worker may declare.
pub const MAX_CAPABILITY_SCORE: f64 = 10.0;

/// Capability scores, cost, latency and concurrency limits of a worker.
///
/// Immutable once registered in a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerProfile {
    /// Unique worker identifier.
    pub id: WorkerId,

    /// Suitability score per capability, each in [0, 10].
    #[serde(default)]
    pub capability_scores: HashMap<CapabilityTag, f64>,

    /// Blended cost per 1000 tokens (input and output at one rate).
    pub cost_per_k_tokens: f64,

    /// Average latency of one invocation in milliseconds.
    pub avg_latency_ms: f64,

    /// Context window size in tokens.
    #[serde(default)]
    pub context_window: u32,

    /// Maximum number of in-flight invocations.
    pub max_concurrent_tasks: u32,
}

impl WorkerProfile {
    /// Create a new profile with no capabilities, zero cost and latency,
    /// and a concurrency limit of one.
    pub fn new(id: impl Into<WorkerId>) -> Self {
        Self {
            id: id.into(),
            capability_scores: HashMap::new(),
            cost_per_k_tokens: 0.0,
            avg_latency_ms: 0.0,
            context_window: 0,
            max_concurrent_tasks: 1,
        }
    }

    /// Builder method to declare a capability score.
    pub fn with_capability(mut self, tag: CapabilityTag, score: f64) -> Self {
        self.capability_scores.insert(tag, score);
        self
    }

    /// Builder method to set the blended per-1k-token cost.
    pub fn with_cost_per_k_tokens(mut self, cost: f64) -> Self {
        self.cost_per_k_tokens = cost;
        self
    }

    /// Builder method to set the average latency.
    pub fn with_avg_latency_ms(mut self, latency_ms: f64) -> Self {
        self.avg_latency_ms = latency_ms;
        self
    }

    /// Builder method to set the context window.
    pub fn with_context_window(mut self, tokens: u32) -> Self {
        self.context_window = tokens;
        self
    }

    /// Builder method to set the concurrency limit.
    pub fn with_max_concurrent_tasks(mut self, max: u32) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    /// Score for a capability, 0 when the worker does not declare it.
    pub fn capability_score(&self, tag: &CapabilityTag) -> f64 {
        self.capability_scores.get(tag).copied().unwrap_or(0.0)
    }

    /// Estimated cost of an invocation consuming `tokens` tokens.
    pub fn estimate_cost(&self, tokens: u64) -> f64 {
        tokens as f64 / 1000.0 * self.cost_per_k_tokens
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<(), CoreError> {
        let id = self.id.as_str();
        if id.trim().is_empty() {
            return Err(CoreError::configuration(id, "id", "must not be empty"));
        }

        for (tag, score) in &self.capability_scores {
            if !score.is_finite() || !(0.0..=MAX_CAPABILITY_SCORE).contains(score) {
                return Err(CoreError::configuration(
                    id,
                    "capabilityScores",
                    format!("{tag} = {score} is outside [0, 10]"),
                ));
            }
        }

        if !self.cost_per_k_tokens.is_finite() || self.cost_per_k_tokens < 0.0 {
            return Err(CoreError::configuration(
                id,
                "costPerKTokens",
                format!("{} must be a non-negative number", self.cost_per_k_tokens),
            ));
        }

        if !self.avg_latency_ms.is_finite() || self.avg_latency_ms < 0.0 {
            return Err(CoreError::configuration(
                id,
                "avgLatencyMs",
                format!("{} must be a non-negative number", self.avg_latency_ms),
            ));
        }

        if self.max_concurrent_tasks < 1 {
            return Err(CoreError::configuration(
                id,
                "maxConcurrentTasks",
                "must be at least 1",
            ));
        }

        Ok(())
    }
}
