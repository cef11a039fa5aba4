//! Task descriptor (what selection needs) and payload (what execution sends).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{CapabilityTag, CoreError, OptimizationStrategy, WorkerId};

/// A routing request: which capabilities are needed, which workers may
/// serve it, and how to trade quality against speed and cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescriptor {
    /// Capabilities the task needs. Never empty.
    pub required_capabilities: BTreeSet<CapabilityTag>,

    /// Workers the caller allows for this task. May be empty.
    pub available_worker_ids: BTreeSet<WorkerId>,

    /// Scoring strategy.
    #[serde(default)]
    pub strategy: OptimizationStrategy,
}

impl TaskDescriptor {
    /// Create a new TaskDescriptor, rejecting an empty capability set.
    pub fn new(
        required_capabilities: impl IntoIterator<Item = CapabilityTag>,
        available_worker_ids: impl IntoIterator<Item = WorkerId>,
        strategy: OptimizationStrategy,
    ) -> Result<Self, CoreError> {
        let task = Self {
            required_capabilities: required_capabilities.into_iter().collect(),
            available_worker_ids: available_worker_ids.into_iter().collect(),
            strategy,
        };
        task.validate()?;
        Ok(task)
    }

    /// Check invariants that deserialization cannot enforce.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.required_capabilities.is_empty() {
            return Err(CoreError::InvalidInput(
                "task requires at least one capability".to_string(),
            ));
        }
        Ok(())
    }

    /// Check whether the task requires the given capability.
    pub fn requires(&self, tag: &CapabilityTag) -> bool {
        self.required_capabilities.contains(tag)
    }
}

/// The prompt and generation parameters handed to workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    /// Original task prompt.
    pub prompt: String,

    /// Token limit per invocation.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,
}

impl TaskPayload {
    /// Create a payload with default generation parameters.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }

    /// Builder method to set the token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Builder method to set the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_capabilities_rejected() {
        let result = TaskDescriptor::new(
            [],
            [WorkerId::new("claude")],
            OptimizationStrategy::Quality,
        );
        assert!(matches!(result, Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn test_duplicate_ids_collapse() {
        let task = TaskDescriptor::new(
            [CapabilityTag::CodeGeneration, CapabilityTag::CodeGeneration],
            [WorkerId::new("a"), WorkerId::new("a")],
            OptimizationStrategy::Cost,
        )
        .unwrap();
        assert_eq!(task.required_capabilities.len(), 1);
        assert_eq!(task.available_worker_ids.len(), 1);
        assert!(task.requires(&CapabilityTag::CodeGeneration));
    }

    #[test]
    fn test_deserialized_task_validates() {
        let json = r#"{"requiredCapabilities": [], "availableWorkerIds": ["a"]}"#;
        let task: TaskDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(task.strategy, OptimizationStrategy::Balanced);
        assert!(task.validate().is_err());
    }

    #[test]
    fn test_unrecognized_capability_accepted() {
        let json = r#"{"requiredCapabilities": ["VIDEO_EDITING"], "availableWorkerIds": []}"#;
        let task: TaskDescriptor = serde_json::from_str(json).unwrap();
        assert!(task.validate().is_ok());
        assert!(task.requires(&CapabilityTag::Other("VIDEO_EDITING".to_string())));
    }
}
