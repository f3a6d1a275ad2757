//! Execution engine for regente
//!
//! The engine orchestrates:
//! 1. Ordering - deterministic sequencing of the resolved selection
//! 2. Preflight - credential validation and engine bootstrap
//! 3. Executing - draining the queue fail-fast on a background worker,
//!    reporting through a run-event channel

pub mod events;
pub mod orchestrator;

pub use events::{Failure, FailureKind, RunEvent};
pub use orchestrator::{execution_order, Orchestrator, RunError, RunState};
