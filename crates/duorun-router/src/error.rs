//! Router errors.

use std::time::Duration;

use duorun_core::{CoreError, Stage, WorkerId};
use thiserror::Error;

use crate::adapter::AdapterError;

/// Errors surfaced by selection and execution.
///
/// Per-stage variants carry the worker, stage and capability category.
#[derive(Debug, Error)]
pub enum RouterError {
    /// No worker of the request resolved against the catalog.
    #[error("No workers available for category {category} ({requested} requested, none in catalog)")]
    InsufficientWorkers { requested: usize, category: String },

    /// The concurrency guard denied admission.
    #[error("Worker '{worker_id}' at capacity for {stage} stage ({category})")]
    WorkerUnavailable {
        worker_id: WorkerId,
        stage: Stage,
        category: String,
    },

    /// The adapter call failed.
    #[error("Worker '{worker_id}' failed during {stage} stage ({category}): {source}")]
    WorkerInvocation {
        worker_id: WorkerId,
        stage: Stage,
        category: String,
        #[source]
        source: AdapterError,
    },

    /// The adapter call exceeded the stage timeout.
    #[error("Worker '{worker_id}' timed out after {timeout:?} during {stage} stage ({category})")]
    StageTimeout {
        worker_id: WorkerId,
        stage: Stage,
        category: String,
        timeout: Duration,
    },

    /// The caller cancelled the pipeline.
    #[error("Pipeline cancelled during {stage} stage on worker '{worker_id}' ({category})")]
    Cancelled {
        worker_id: WorkerId,
        stage: Stage,
        category: String,
    },

    /// A planned worker has no registered adapter.
    #[error("No adapter registered for worker '{worker_id}' ({stage} stage, {category})")]
    AdapterMissing {
        worker_id: WorkerId,
        stage: Stage,
        category: String,
    },

    /// A planned worker is no longer in the catalog, e.g. after a refresh.
    #[error("Worker '{worker_id}' not in catalog for {stage} stage ({category})")]
    WorkerNotInCatalog {
        worker_id: WorkerId,
        stage: Stage,
        category: String,
    },

    /// Malformed catalog or configuration.
    #[error("Configuration error: {0}")]
    Configuration(#[from] CoreError),

    /// The task descriptor is malformed.
    #[error("Invalid task: {0}")]
    InvalidTask(String),
}

impl RouterError {
    /// True for conditions the caller may retry later. The router itself
    /// never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::WorkerUnavailable { .. } | Self::StageTimeout { .. })
    }

    /// Worker the error concerns, if it concerns one.
    pub fn worker_id(&self) -> Option<&WorkerId> {
        match self {
            Self::WorkerUnavailable { worker_id, .. }
            | Self::WorkerInvocation { worker_id, .. }
            | Self::StageTimeout { worker_id, .. }
            | Self::Cancelled { worker_id, .. }
            | Self::AdapterMissing { worker_id, .. }
            | Self::WorkerNotInCatalog { worker_id, .. } => Some(worker_id),
            _ => None,
        }
    }

    /// Stage the error occurred in, if it occurred during execution.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::WorkerUnavailable { stage, .. }
            | Self::WorkerInvocation { stage, .. }
            | Self::StageTimeout { stage, .. }
            | Self::Cancelled { stage, .. }
            | Self::AdapterMissing { stage, .. }
            | Self::WorkerNotInCatalog { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
