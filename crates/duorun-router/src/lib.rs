//! DuoRun Router Library
//!
//! Selects one or two workers for a task from a capability catalog and runs
//! them as a two-stage pipeline where the secondary refines the primary's
//! output.
//!
//! Control flow: a [`TaskDescriptor`](duorun_core::TaskDescriptor) goes to the
//! [`DuoSelector`], which ranks catalog entries with the [`scorer`] and
//! returns a [`DuoPlan`](duorun_core::DuoPlan). The plan and a payload go to
//! the [`ExecutionPipeline`], which holds [`ConcurrencyGuard`] permits around
//! each worker invocation and appends every invocation to the
//! [`PerformanceLedger`].

pub mod adapter;
pub mod catalog;
pub mod config;
pub mod error;
pub mod guard;
pub mod ledger;
pub mod metrics;
pub mod pipeline;
pub mod prompt;
pub mod router;
pub mod scorer;
pub mod selector;

pub use adapter::{
    AdapterError, AdapterRegistry, InvocationOutput, InvocationRequest, TokenUsage, WorkerAdapter,
};
pub use catalog::CapabilityCatalog;
pub use config::RouterConfig;
pub use error::RouterError;
pub use guard::{ConcurrencyGuard, GuardPermit};
pub use ledger::PerformanceLedger;
pub use pipeline::{ExecutionOptions, ExecutionPipeline};
pub use router::Router;
pub use selector::DuoSelector;
