//! DuoRun Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Async runtimes
//! - Network clients for any model provider
//! - Storage
//!
//! All types here describe the routing domain: worker profiles, the
//! capabilities they are scored on, the plans produced by selection and
//! the records produced by execution.

pub mod capability;
pub mod error;
pub mod ids;
pub mod plan;
pub mod profile;
pub mod record;
pub mod result;
pub mod task;

// Re-export commonly used types
pub use capability::{CapabilityTag, OptimizationStrategy};
pub use error::CoreError;
pub use ids::{RecordId, WorkerId};
pub use plan::{DuoPlan, Stage};
pub use profile::WorkerProfile;
pub use record::{ExecutionRecord, PerformanceSummary, TimeWindow};
pub use result::CombinedResult;
pub use task::{TaskDescriptor, TaskPayload};
