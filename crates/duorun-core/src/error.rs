//! Core domain errors.

use thiserror::Error;

/// Core domain errors for DuoRun.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A worker profile failed validation.
    #[error("Invalid profile for worker '{worker_id}': {field} {reason}")]
    Configuration {
        worker_id: String,
        field: &'static str,
        reason: String,
    },

    /// Worker not found.
    #[error("Worker not found: {0}")]
    WorkerNotFound(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CoreError {
    pub(crate) fn configuration(
        worker_id: impl Into<String>,
        field: &'static str,
        reason: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            worker_id: worker_id.into(),
            field,
            reason: reason.into(),
        }
    }
}
