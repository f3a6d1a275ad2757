//! # Runbook
//!
//! Invocation layer for a declarative automation engine (Ansible).
//!
//! This crate provides the boundary between an orchestrator and the
//! external engine process: building an invocation, supplying the
//! privilege-escalation credential through the child environment,
//! validating that credential up front, and bootstrapping the engine
//! binary when it is missing.
//!
//! ## Core Concepts
//!
//! - **Credential**: the become password, zeroized on drop, never
//!   placed on a command line
//! - **RunRequest / RunOutput**: one engine invocation and its captured
//!   result
//! - **Invoker**: trait over "run this unit" so orchestrators can be
//!   tested without a real engine
//! - **Bootstrap**: presence check and package-manager install of the
//!   engine binary
//!
//! ## Provider Traits
//!
//! [`Invoker`] is the seam for dependency injection: the concrete
//! [`AnsibleInvoker`] spawns `ansible-playbook`, while tests substitute
//! a scripted implementation. `validate` and `ensure_engine` have
//! default implementations backed by `sudo` and the system package
//! manager so a mock only needs to override what it cares about.

pub mod bootstrap;
pub mod credential;
pub mod error;
pub mod invoker;

mod process;

// Re-export main types at crate root
pub use bootstrap::{engine_present, install_engine, ENGINE_BINARY};
pub use credential::{validate, Credential, VALIDATE_TIMEOUT};
pub use error::RunbookError;
pub use invoker::{AnsibleInvoker, Invoker, RunOutput, RunRequest, BECOME_PASS_ENV};
