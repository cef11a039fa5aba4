//! Duo plans produced by selection.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::{OptimizationStrategy, WorkerId};

/// Position of a worker in the two-stage pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// First stage; produces the material the secondary refines.
    Primary,
    /// Refinement stage; sees the primary output and the original prompt.
    Secondary,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

/// The primary/secondary worker pair chosen for a task, with their roles.
///
/// With at least two candidates `primary != secondary`. With one candidate
/// `secondary` and `secondary_role` are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuoPlan {
    /// Worker running the first stage.
    pub primary: WorkerId,

    /// Worker refining the primary's output, if any.
    pub secondary: Option<WorkerId>,

    /// Directive prefixed to the primary's prompt.
    pub primary_role: String,

    /// Directive prefixed to the secondary's prompt.
    pub secondary_role: Option<String>,

    /// Score of every candidate considered, not only the chosen pair.
    pub scores: HashMap<WorkerId, f64>,

    /// Strategy the scores were computed with.
    pub strategy: OptimizationStrategy,

    /// Capability category used for records and diagnostics.
    pub category: String,

    /// Human-readable routing reason.
    pub rationale: String,
}

impl DuoPlan {
    /// True when only one worker was resolvable.
    pub fn is_degraded(&self) -> bool {
        self.secondary.is_none()
    }

    /// Worker and role for a stage, if the plan has one.
    pub fn stage(&self, stage: Stage) -> Option<(&WorkerId, &str)> {
        match stage {
            Stage::Primary => Some((&self.primary, self.primary_role.as_str())),
            Stage::Secondary => self
                .secondary
                .as_ref()
                .zip(self.secondary_role.as_deref()),
        }
    }
}
