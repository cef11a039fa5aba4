//! Duo selector - ranks catalog workers for a task and assigns roles.

use std::collections::HashMap;
use std::sync::Arc;

use duorun_core::{CapabilityTag, DuoPlan, TaskDescriptor, WorkerId, WorkerProfile};
use tracing::{debug, info, warn};

use crate::catalog::CapabilityCatalog;
use crate::error::RouterError;
use crate::guard::ConcurrencyGuard;
use crate::scorer;

/// Roles assigned when a required capability triggers a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRule {
    pub trigger: CapabilityTag,
    pub primary_role: &'static str,
    pub secondary_role: &'static str,
}

/// Evaluated top-down; the first rule whose trigger is required wins.
pub static ROLE_RULES: [RoleRule; 4] = [
    RoleRule {
        trigger: CapabilityTag::ImageAnalysis,
        primary_role: "Analyze visual input and extract insights",
        secondary_role: "Generate/refine output using visual insights",
    },
    RoleRule {
        trigger: CapabilityTag::CodeGeneration,
        primary_role: "Generate implementation",
        secondary_role: "Review, debug, and optimize the implementation",
    },
    RoleRule {
        trigger: CapabilityTag::BrandVoice,
        primary_role: "Generate brand-aligned draft",
        secondary_role: "Refine tone and messaging",
    },
    RoleRule {
        trigger: CapabilityTag::ApiDesign,
        primary_role: "Design architecture/schema",
        secondary_role: "Implement and document",
    },
];

pub const DEFAULT_PRIMARY_ROLE: &str = "Primary execution";
pub const DEFAULT_SECONDARY_ROLE: &str = "Review and enhancement";

/// First matching rule for the task, if any.
pub fn matching_rule(task: &TaskDescriptor) -> Option<&'static RoleRule> {
    ROLE_RULES.iter().find(|rule| task.requires(&rule.trigger))
}

/// Category used in plans, records and errors: the triggering capability,
/// or the first required capability when no rule matched.
pub fn task_category(task: &TaskDescriptor) -> String {
    matching_rule(task)
        .map(|rule| &rule.trigger)
        .or_else(|| task.required_capabilities.iter().next())
        .map(|tag| tag.to_string())
        .unwrap_or_default()
}

/// A candidate and its score.
#[derive(Debug, Clone)]
pub struct RankedWorker {
    pub profile: Arc<WorkerProfile>,
    pub score: f64,
}

/// Selects the primary/secondary pair for tasks.
#[derive(Debug, Clone)]
pub struct DuoSelector {
    catalog: Arc<CapabilityCatalog>,
    load: Option<(Arc<ConcurrencyGuard>, f64)>,
}

impl DuoSelector {
    /// Create a selector over a populated catalog.
    pub fn new(catalog: Arc<CapabilityCatalog>) -> Self {
        Self {
            catalog,
            load: None,
        }
    }

    /// Subtract `penalty * in_flight / capacity` from each candidate's
    /// score. Saturated workers stay selectable.
    pub fn with_load_penalty(mut self, guard: Arc<ConcurrencyGuard>, penalty: f64) -> Self {
        if penalty > 0.0 {
            self.load = Some((guard, penalty));
        }
        self
    }

    pub fn catalog(&self) -> &Arc<CapabilityCatalog> {
        &self.catalog
    }

    /// Score every resolvable worker, best first. Ties keep catalog
    /// registration order.
    pub fn rank(&self, task: &TaskDescriptor) -> Vec<RankedWorker> {
        for id in &task.available_worker_ids {
            if !self.catalog.contains(id) {
                warn!(worker_id = %id, "Requested worker not in catalog, skipping");
            }
        }

        let mut ranked: Vec<RankedWorker> = self
            .catalog
            .list_available(&task.available_worker_ids)
            .into_iter()
            .map(|profile| {
                let mut score =
                    scorer::score(&profile, &task.required_capabilities, task.strategy);
                if let Some((guard, penalty)) = &self.load {
                    score -= penalty * guard.load(&profile.id);
                }
                RankedWorker { profile, score }
            })
            .collect();

        // Stable sort: equal scores stay in registration order.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }

    /// Choose the primary and (when possible) secondary worker for a task.
    pub fn select(&self, task: &TaskDescriptor) -> Result<DuoPlan, RouterError> {
        task.validate()
            .map_err(|e| RouterError::InvalidTask(e.to_string()))?;

        let category = task_category(task);
        let ranked = self.rank(task);
        let scores: HashMap<WorkerId, f64> = ranked
            .iter()
            .map(|candidate| (candidate.profile.id.clone(), candidate.score))
            .collect();

        for candidate in &ranked {
            debug!(
                worker_id = %candidate.profile.id,
                score = candidate.score,
                strategy = %task.strategy,
                "Scored candidate"
            );
        }

        let plan = match ranked.as_slice() {
            [] => {
                return Err(RouterError::InsufficientWorkers {
                    requested: task.available_worker_ids.len(),
                    category,
                });
            }
            [only] => DuoPlan {
                primary: only.profile.id.clone(),
                secondary: None,
                primary_role: DEFAULT_PRIMARY_ROLE.to_string(),
                secondary_role: None,
                rationale: format!(
                    "{} strategy: single worker {} available (score {:.2}), running without refinement",
                    task.strategy, only.profile.id, only.score
                ),
                scores,
                strategy: task.strategy,
                category,
            },
            [first, second, ..] => {
                let (primary_role, secondary_role, rule_name) = match matching_rule(task) {
                    Some(rule) => (
                        rule.primary_role,
                        rule.secondary_role,
                        rule.trigger.to_string(),
                    ),
                    None => (
                        DEFAULT_PRIMARY_ROLE,
                        DEFAULT_SECONDARY_ROLE,
                        "default".to_string(),
                    ),
                };
                DuoPlan {
                    primary: first.profile.id.clone(),
                    secondary: Some(second.profile.id.clone()),
                    primary_role: primary_role.to_string(),
                    secondary_role: Some(secondary_role.to_string()),
                    rationale: format!(
                        "{} strategy: {} ({:.2}) leads, {} ({:.2}) refines; roles from {} rule",
                        task.strategy,
                        first.profile.id,
                        first.score,
                        second.profile.id,
                        second.score,
                        rule_name
                    ),
                    scores,
                    strategy: task.strategy,
                    category,
                }
            }
        };

        info!(
            primary = %plan.primary,
            secondary = ?plan.secondary.as_ref().map(WorkerId::as_str),
            category = %plan.category,
            candidates = plan.scores.len(),
            "Selected duo"
        );

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duorun_core::OptimizationStrategy;

    fn ids(names: &[&str]) -> Vec<WorkerId> {
        names.iter().map(|n| WorkerId::new(*n)).collect()
    }

    fn coding_catalog() -> Arc<CapabilityCatalog> {
        Arc::new(
            CapabilityCatalog::from_profiles([
                WorkerProfile::new("claude")
                    .with_capability(CapabilityTag::CodeGeneration, 9.5)
                    .with_capability(CapabilityTag::CodeReview, 9.8)
                    .with_max_concurrent_tasks(2),
                WorkerProfile::new("codex")
                    .with_capability(CapabilityTag::CodeGeneration, 9.8)
                    .with_capability(CapabilityTag::CodeReview, 8.8)
                    .with_max_concurrent_tasks(2),
            ])
            .unwrap(),
        )
    }

    fn task(
        caps: &[CapabilityTag],
        workers: &[&str],
        strategy: OptimizationStrategy,
    ) -> TaskDescriptor {
        TaskDescriptor::new(caps.iter().cloned(), ids(workers), strategy).unwrap()
    }

    #[test]
    fn test_code_duo_end_to_end() {
        let selector = DuoSelector::new(coding_catalog());
        let plan = selector
            .select(&task(
                &[CapabilityTag::CodeGeneration, CapabilityTag::CodeReview],
                &["claude", "codex"],
                OptimizationStrategy::Quality,
            ))
            .unwrap();

        assert_eq!(plan.primary.as_str(), "claude");
        assert_eq!(plan.secondary.as_ref().unwrap().as_str(), "codex");
        assert_eq!(plan.primary_role, "Generate implementation");
        assert_eq!(
            plan.secondary_role.as_deref(),
            Some("Review, debug, and optimize the implementation")
        );
        assert!((plan.scores[&WorkerId::new("claude")] - 9.65).abs() < 1e-9);
        assert!((plan.scores[&WorkerId::new("codex")] - 9.3).abs() < 1e-9);
        assert_eq!(plan.category, "CODE_GENERATION");
    }

    #[test]
    fn test_single_worker_degrades() {
        let selector = DuoSelector::new(coding_catalog());
        let plan = selector
            .select(&task(
                &[CapabilityTag::CodeReview],
                &["codex", "ghost"],
                OptimizationStrategy::Quality,
            ))
            .unwrap();

        assert_eq!(plan.primary.as_str(), "codex");
        assert!(plan.secondary.is_none());
        assert!(plan.secondary_role.is_none());
        assert_eq!(plan.primary_role, DEFAULT_PRIMARY_ROLE);
        assert_eq!(plan.scores.len(), 1);
    }

    #[test]
    fn test_no_resolvable_workers() {
        let selector = DuoSelector::new(coding_catalog());
        let err = selector
            .select(&task(
                &[CapabilityTag::CodeReview],
                &["ghost"],
                OptimizationStrategy::Quality,
            ))
            .unwrap_err();
        assert!(matches!(err, RouterError::InsufficientWorkers { requested: 1, .. }));

        let err = selector
            .select(&task(&[CapabilityTag::CodeReview], &[], OptimizationStrategy::Cost))
            .unwrap_err();
        assert!(matches!(err, RouterError::InsufficientWorkers { requested: 0, .. }));
    }

    #[test]
    fn test_ties_go_to_first_registered() {
        let catalog = Arc::new(
            CapabilityCatalog::from_profiles([
                WorkerProfile::new("zulu").with_capability(CapabilityTag::Reasoning, 8.0),
                WorkerProfile::new("alpha").with_capability(CapabilityTag::Reasoning, 8.0),
                WorkerProfile::new("mike").with_capability(CapabilityTag::Reasoning, 8.0),
            ])
            .unwrap(),
        );
        let selector = DuoSelector::new(catalog);
        let plan = selector
            .select(&task(
                &[CapabilityTag::Reasoning],
                &["mike", "alpha", "zulu"],
                OptimizationStrategy::Quality,
            ))
            .unwrap();

        assert_eq!(plan.primary.as_str(), "zulu");
        assert_eq!(plan.secondary.unwrap().as_str(), "alpha");
        assert_eq!(plan.primary_role, DEFAULT_PRIMARY_ROLE);
        assert_eq!(plan.secondary_role.as_deref(), Some(DEFAULT_SECONDARY_ROLE));
        assert_eq!(plan.scores.len(), 3);
    }

    #[test]
    fn test_role_rules_first_match_wins() {
        let cases = [
            (
                vec![CapabilityTag::CodeGeneration, CapabilityTag::ImageAnalysis],
                "Analyze visual input and extract insights",
            ),
            (
                vec![CapabilityTag::ApiDesign, CapabilityTag::CodeGeneration],
                "Generate implementation",
            ),
            (
                vec![CapabilityTag::ApiDesign, CapabilityTag::BrandVoice],
                "Generate brand-aligned draft",
            ),
            (vec![CapabilityTag::ApiDesign], "Design architecture/schema"),
            (vec![CapabilityTag::DataAnalysis], DEFAULT_PRIMARY_ROLE),
        ];

        let selector = DuoSelector::new(coding_catalog());
        for (caps, expected) in cases {
            let plan = selector
                .select(&task(&caps, &["claude", "codex"], OptimizationStrategy::Balanced))
                .unwrap();
            assert_eq!(plan.primary_role, expected, "caps={caps:?}");
        }
    }

    #[test]
    fn test_pair_is_distinct_for_every_strategy() {
        let catalog = Arc::new(
            CapabilityCatalog::from_profiles((0..6).map(|i| {
                WorkerProfile::new(format!("w{i}"))
                    .with_capability(CapabilityTag::CodeGeneration, f64::from(i % 3) * 3.0)
                    .with_cost_per_k_tokens(f64::from(i) * 0.004)
                    .with_avg_latency_ms(f64::from(6 - i) * 300.0)
            }))
            .unwrap(),
        );
        let selector = DuoSelector::new(catalog);
        let strategies = [
            OptimizationStrategy::Quality,
            OptimizationStrategy::Speed,
            OptimizationStrategy::Cost,
            OptimizationStrategy::Balanced,
        ];
        let pools: [&[&str]; 4] = [
            &["w0", "w1"],
            &["w5", "w4", "w3"],
            &["w0", "w1", "w2", "w3", "w4", "w5"],
            &["w2", "w2", "w4"],
        ];

        for strategy in strategies {
            for pool in pools {
                let task = task(&[CapabilityTag::CodeGeneration], pool, strategy);
                let plan = selector.select(&task).unwrap();
                let secondary = plan.secondary.clone().unwrap();
                assert_ne!(plan.primary, secondary);
                assert!(task.available_worker_ids.contains(&plan.primary));
                assert!(task.available_worker_ids.contains(&secondary));
            }
        }
    }

    #[test]
    fn test_load_penalty_demotes_busy_worker() {
        let catalog = coding_catalog();
        let guard = Arc::new(ConcurrencyGuard::new(&catalog));
        let selector = DuoSelector::new(catalog).with_load_penalty(guard.clone(), 1.0);
        let task = task(
            &[CapabilityTag::CodeGeneration, CapabilityTag::CodeReview],
            &["claude", "codex"],
            OptimizationStrategy::Quality,
        );

        assert_eq!(selector.select(&task).unwrap().primary.as_str(), "claude");

        let _a = guard.acquire(&WorkerId::new("claude")).unwrap();
        let _b = guard.acquire(&WorkerId::new("claude")).unwrap();
        let plan = selector.select(&task).unwrap();
        assert_eq!(plan.primary.as_str(), "codex");
        assert_eq!(plan.secondary.unwrap().as_str(), "claude");
    }

    #[test]
    fn test_unknown_capability_still_routes() {
        let selector = DuoSelector::new(coding_catalog());
        let unknown = CapabilityTag::Other("VIDEO_EDITING".to_string());
        let plan = selector
            .select(&task(
                &[CapabilityTag::CodeReview, unknown],
                &["claude", "codex"],
                OptimizationStrategy::Quality,
            ))
            .unwrap();

        assert_eq!(plan.primary.as_str(), "claude");
        assert!((plan.scores[&WorkerId::new("claude")] - 4.9).abs() < 1e-9);
        assert!((plan.scores[&WorkerId::new("codex")] - 4.4).abs() < 1e-9);
        assert_eq!(plan.category, "CODE_REVIEW");
        assert_eq!(plan.primary_role, DEFAULT_PRIMARY_ROLE);
    }

    #[test]
    fn test_invalid_task_rejected() {
        let selector = DuoSelector::new(coding_catalog());
        let mut task = task(
            &[CapabilityTag::CodeReview],
            &["claude"],
            OptimizationStrategy::Quality,
        );
        task.required_capabilities.clear();
        assert!(matches!(
            selector.select(&task),
            Err(RouterError::InvalidTask(_))
        ));
    }
}
