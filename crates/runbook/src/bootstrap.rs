//! Engine bootstrap - presence check and package-manager install

use std::io::Write;
use std::process::{Command, Stdio};

use crate::credential::Credential;
use crate::error::RunbookError;
use crate::process::{wait_limited, Drain};

/// Binary the orchestrator invokes for every unit
pub const ENGINE_BINARY: &str = "ansible-playbook";

/// Package that provides the engine binary
const ENGINE_PACKAGE: &str = "ansible";

/// Check if the engine binary is reachable on `$PATH`
pub fn engine_present() -> bool {
    Command::new("which")
        .arg(ENGINE_BINARY)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Install the engine through the system package manager.
///
/// Reuses the already-validated become credential over `sudo -S`; the
/// caller is expected to have run the credential check first so this
/// does not stall on a password prompt.
pub fn install_engine(credential: &Credential) -> Result<(), RunbookError> {
    let mut child = Command::new("sudo")
        .args(["-S", "-p", "", "apt-get", "install", "-y", ENGINE_PACKAGE])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        let _ = writeln!(stdin, "{}", credential.expose());
    }

    let drain = Drain::start(&mut child);
    let status = wait_limited(&mut child, None)?;
    let (_, stderr) = drain.join();

    match status {
        Some(status) if status.success() => Ok(()),
        _ => {
            let detail = stderr.trim();
            Err(RunbookError::Bootstrap(if detail.is_empty() {
                format!("`apt-get install {ENGINE_PACKAGE}` failed")
            } else {
                detail.to_string()
            }))
        }
    }
}
