//! Run events - the orchestrator's only channel back to the caller
//!
//! The background worker never touches presentation state directly;
//! everything an observer needs (progress, per-unit output, the final
//! outcome) is delivered as messages over an mpsc channel and consumed
//! on whatever thread the caller prefers.

/// Which stage of a run a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Become password missing or rejected
    Credential,
    /// Engine binary absent and installing it failed
    Bootstrap,
    /// Unit definition file could not be resolved
    MissingDefinition,
    /// Engine could not be invoked at all
    Engine,
    /// Engine ran the unit and reported a non-zero exit
    Unit,
}

/// Structured run failure with the offending unit and captured output
#[derive(Debug, Clone)]
pub struct Failure {
    pub kind: FailureKind,
    pub unit: Option<String>,
    pub detail: String,
}

impl Failure {
    pub fn new(kind: FailureKind, unit: Option<&str>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            unit: unit.map(str::to_string),
            detail: detail.into(),
        }
    }
}

/// Observations emitted by the run worker, in order
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// Preflight passed; the queue is about to drain
    Started { total: usize },
    /// One unit is being handed to the engine
    UnitStarted {
        index: usize,
        total: usize,
        name: String,
    },
    /// Captured combined output of a finished engine invocation
    UnitOutput { name: String, output: String },
    /// The unit applied cleanly and was recorded as installed
    UnitFinished { name: String },
    /// Whole queue drained without failure; terminal
    Finished,
    /// The run aborted; no further units were attempted; terminal
    Failed(Failure),
}
