//! Strategy-adjusted suitability scoring.
//!
//! Scores are not clamped; a negative score is valid and ranks lower.

use std::collections::BTreeSet;

use duorun_core::{CapabilityTag, OptimizationStrategy, WorkerProfile};

/// Latency (ms) at which the balanced latency term reaches zero.
const BALANCED_LATENCY_SCALE_MS: f64 = 2000.0;

/// Per-1k-token cost at which the balanced cost term reaches zero.
const BALANCED_COST_SCALE: f64 = 0.02;

/// Mean capability score over the required set; undeclared tags count as 0.
pub fn base_score(profile: &WorkerProfile, required: &BTreeSet<CapabilityTag>) -> f64 {
    if required.is_empty() {
        return 0.0;
    }
    let sum: f64 = required
        .iter()
        .map(|tag| profile.capability_score(tag))
        .sum();
    sum / required.len() as f64
}

/// Suitability of a worker for a capability set under a strategy.
pub fn score(
    profile: &WorkerProfile,
    required: &BTreeSet<CapabilityTag>,
    strategy: OptimizationStrategy,
) -> f64 {
    let base = base_score(profile, required);
    match strategy {
        OptimizationStrategy::Quality => base,
        OptimizationStrategy::Speed => base - profile.avg_latency_ms / 1000.0,
        OptimizationStrategy::Cost => base - profile.cost_per_k_tokens * 10.0,
        OptimizationStrategy::Balanced => {
            0.6 * base
                + 0.2 * (1.0 - profile.avg_latency_ms / BALANCED_LATENCY_SCALE_MS)
                + 0.2 * (1.0 - profile.cost_per_k_tokens / BALANCED_COST_SCALE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(tags: &[CapabilityTag]) -> BTreeSet<CapabilityTag> {
        tags.iter().cloned().collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_quality_is_plain_mean() {
        let profile = WorkerProfile::new("gemini").with_capability(CapabilityTag::ImageAnalysis, 9.8);
        let required = caps(&[CapabilityTag::ImageAnalysis]);
        assert!(close(
            score(&profile, &required, OptimizationStrategy::Quality),
            9.8
        ));
    }

    #[test]
    fn test_undeclared_capability_scores_zero() {
        let profile = WorkerProfile::new("claude").with_capability(CapabilityTag::CodeReview, 9.0);
        let required = caps(&[CapabilityTag::CodeReview, CapabilityTag::ImageGeneration]);
        assert!(close(base_score(&profile, &required), 4.5));
    }

    #[test]
    fn test_unknown_required_tag_scores_zero() {
        let profile = WorkerProfile::new("claude").with_capability(CapabilityTag::CodeReview, 9.0);
        let unknown: CapabilityTag = "TELEPATHY".parse().unwrap();
        let required = caps(&[CapabilityTag::CodeReview, unknown.clone()]);
        assert!(close(base_score(&profile, &required), 4.5));
        assert!(close(
            score(&profile, &caps(&[unknown]), OptimizationStrategy::Quality),
            0.0
        ));
    }

    #[test]
    fn test_speed_penalizes_latency() {
        let profile = WorkerProfile::new("fast")
            .with_capability(CapabilityTag::Reasoning, 8.0)
            .with_avg_latency_ms(1500.0);
        let required = caps(&[CapabilityTag::Reasoning]);
        assert!(close(score(&profile, &required, OptimizationStrategy::Speed), 6.5));
    }

    #[test]
    fn test_cost_never_exceeds_quality_when_priced() {
        let required = caps(&[CapabilityTag::CodeGeneration, CapabilityTag::Testing]);
        for cost in [0.0001, 0.002, 0.015, 0.5, 3.0] {
            let profile = WorkerProfile::new("w")
                .with_capability(CapabilityTag::CodeGeneration, 9.0)
                .with_capability(CapabilityTag::Testing, 6.0)
                .with_cost_per_k_tokens(cost);
            let cost_score = score(&profile, &required, OptimizationStrategy::Cost);
            let quality_score = score(&profile, &required, OptimizationStrategy::Quality);
            assert!(cost_score <= quality_score, "cost={cost}");
        }
    }

    #[test]
    fn test_balanced_formula() {
        let profile = WorkerProfile::new("claude")
            .with_capability(CapabilityTag::BrandVoice, 9.0)
            .with_avg_latency_ms(1000.0)
            .with_cost_per_k_tokens(0.01);
        let required = caps(&[CapabilityTag::BrandVoice]);
        // 0.6*9 + 0.2*0.5 + 0.2*0.5
        assert!(close(
            score(&profile, &required, OptimizationStrategy::Balanced),
            5.6
        ));
    }

    #[test]
    fn test_scores_are_not_clamped() {
        let profile = WorkerProfile::new("slow")
            .with_capability(CapabilityTag::Research, 1.0)
            .with_avg_latency_ms(12_000.0)
            .with_cost_per_k_tokens(0.2);
        let required = caps(&[CapabilityTag::Research]);
        assert!(score(&profile, &required, OptimizationStrategy::Speed) < 0.0);
        assert!(score(&profile, &required, OptimizationStrategy::Cost) < 0.0);
        assert!(score(&profile, &required, OptimizationStrategy::Balanced) < 0.0);
    }
}
