//! Privilege-escalation credential handling
//!
//! The become password lives in process memory only as long as a run
//! needs it, is zeroized on drop, and is handed to children via stdin
//! or the environment - never via argv, which is world-readable.

use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::RunbookError;
use crate::process::{wait_limited, Drain};

/// How long a privilege check may take before it is abandoned
pub const VALIDATE_TIMEOUT: Duration = Duration::from_secs(10);

/// The become password, wiped from memory on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Borrow the raw secret; callers must not persist or print it
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Check the credential against sudo without running anything.
///
/// Uses `sudo -Sk -v`: `-S` reads the password from stdin, `-k` ignores
/// any cached timestamp so the check is a real one, `-v` validates
/// without executing a command. Bounded by `timeout` because a
/// misconfigured PAM stack can hang this call indefinitely.
pub fn validate(credential: &Credential, timeout: Duration) -> Result<(), RunbookError> {
    if credential.is_empty() {
        return Err(RunbookError::Credential("empty password".to_string()));
    }

    let mut child = Command::new("sudo")
        .args(["-Sk", "-p", "", "-v"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        // A write failure here just means sudo exited early; the exit
        // status below is the signal that matters.
        let _ = writeln!(stdin, "{}", credential.expose());
    }

    let drain = Drain::start(&mut child);
    let status = wait_limited(&mut child, Some(timeout))?;
    let Some(status) = status else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(RunbookError::CredentialTimeout(timeout));
    };

    let (_, stderr) = drain.join();
    if status.success() {
        Ok(())
    } else {
        let detail = stderr.trim();
        Err(RunbookError::Credential(if detail.is_empty() {
            "password rejected".to_string()
        } else {
            detail.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_is_redacted() {
        let credential = Credential::new("hunter2");
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn empty_credential_is_rejected_without_spawning() {
        let credential = Credential::new("");
        let err = validate(&credential, VALIDATE_TIMEOUT).unwrap_err();
        assert!(matches!(err, RunbookError::Credential(_)));
    }

    #[test]
    fn expose_returns_the_secret() {
        let credential = Credential::new("s3cret");
        assert_eq!(credential.expose(), "s3cret");
        assert!(!credential.is_empty());
    }
}
