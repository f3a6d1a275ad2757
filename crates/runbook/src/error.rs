//! Error types for engine invocation

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced across the invocation boundary
#[derive(Debug, Error)]
pub enum RunbookError {
    /// The become password was rejected or could not be checked
    #[error("privilege validation failed: {0}")]
    Credential(String),

    /// The privilege check did not come back in time
    #[error("privilege validation timed out after {0:?}")]
    CredentialTimeout(Duration),

    /// The engine binary is missing and installing it failed
    #[error("automation engine bootstrap failed: {0}")]
    Bootstrap(String),

    /// The engine process outlived the configured limit and was killed
    #[error("engine invocation timed out after {0:?}")]
    Timeout(Duration),

    /// Spawning or talking to a child process failed
    #[error("failed to execute process: {0}")]
    Io(#[from] std::io::Error),
}
