//! Combined output of a pipeline execution.

use serde::{Deserialize, Serialize};

/// Outputs of both stages plus aggregated latency and cost.
///
/// `partial` is set when the refinement stage was lost and `final_output`
/// falls back to the primary output. Callers must inspect it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedResult {
    pub primary_output: String,
    pub secondary_output: Option<String>,
    pub final_output: String,
    pub total_latency_ms: u64,
    pub total_cost_estimate: f64,
    pub partial: bool,
    /// Why the secondary stage was lost, when `partial` is set.
    pub secondary_failure: Option<String>,
}

impl CombinedResult {
    /// Result of a plan with only a primary worker.
    pub fn single(output: String, latency_ms: u64, cost: f64) -> Self {
        Self {
            primary_output: output.clone(),
            secondary_output: None,
            final_output: output,
            total_latency_ms: latency_ms,
            total_cost_estimate: cost,
            partial: false,
            secondary_failure: None,
        }
    }

    /// Result where the secondary refined the primary output.
    pub fn refined(
        primary_output: String,
        secondary_output: String,
        latency_ms: u64,
        cost: f64,
    ) -> Self {
        Self {
            primary_output,
            secondary_output: Some(secondary_output.clone()),
            final_output: secondary_output,
            total_latency_ms: latency_ms,
            total_cost_estimate: cost,
            partial: false,
            secondary_failure: None,
        }
    }

    /// Degraded result: the secondary stage failed, the primary output stands.
    pub fn degraded(
        primary_output: String,
        latency_ms: u64,
        cost: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            primary_output: primary_output.clone(),
            secondary_output: None,
            final_output: primary_output,
            total_latency_ms: latency_ms,
            total_cost_estimate: cost,
            partial: true,
            secondary_failure: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_falls_back_to_primary() {
        let result = CombinedResult::degraded("draft".to_string(), 120, 0.2, "timeout");
        assert!(result.partial);
        assert_eq!(result.final_output, "draft");
        assert!(result.secondary_output.is_none());
        assert_eq!(result.secondary_failure.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_refined_uses_secondary() {
        let result = CombinedResult::refined("draft".into(), "final".into(), 300, 0.5);
        assert!(!result.partial);
        assert_eq!(result.final_output, "final");
        assert_eq!(result.primary_output, "draft");
    }
}
