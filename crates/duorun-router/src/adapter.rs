//! Worker adapter seam.
//!
//! Adapters wrap a concrete model backend (HTTP client, subprocess, local
//! model). The router only sees this trait; provider wire protocols live
//! outside the crate.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use duorun_core::WorkerId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors an adapter may report for one invocation.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Network or process failure reaching the backend.
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with an error.
    #[error("provider error: {0}")]
    Provider(String),

    /// The backend answered with something that is not usable output.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// One invocation: the composed prompt and generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Token counts reported by the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Output text and usage of a successful invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationOutput {
    pub text: String,
    pub usage: TokenUsage,
}

/// A backend reachable by the pipeline.
///
/// Implementations must be cancel-safe: the pipeline drops the future on
/// timeout or cancellation.
#[async_trait]
pub trait WorkerAdapter: Send + Sync {
    /// Run one prompt against the backend.
    async fn invoke(&self, request: InvocationRequest) -> Result<InvocationOutput, AdapterError>;
}

/// Adapters indexed by the worker they serve.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<WorkerId, Arc<dyn WorkerAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the adapter for a worker.
    pub fn register(&mut self, worker_id: impl Into<WorkerId>, adapter: Arc<dyn WorkerAdapter>) {
        self.adapters.insert(worker_id.into(), adapter);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_adapter(
        mut self,
        worker_id: impl Into<WorkerId>,
        adapter: Arc<dyn WorkerAdapter>,
    ) -> Self {
        self.register(worker_id, adapter);
        self
    }

    /// Get the adapter for a worker.
    pub fn get(&self, worker_id: &WorkerId) -> Option<Arc<dyn WorkerAdapter>> {
        self.adapters.get(worker_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("workers", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}
