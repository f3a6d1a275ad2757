//! Engine invocation - one playbook run as a child process

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bootstrap::{engine_present, install_engine, ENGINE_BINARY};
use crate::credential::{validate, Credential, VALIDATE_TIMEOUT};
use crate::error::RunbookError;
use crate::process::{wait_limited, Drain};

/// Environment variable the engine reads the become password from.
///
/// Playbooks reference it with an env lookup for
/// `ansible_become_password`; the secret never appears on a command
/// line or in process listings.
pub const BECOME_PASS_ENV: &str = "ANSIBLE_BECOME_PASS";

/// One engine invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    /// Inventory file handed to the engine with `-i`
    pub inventory: PathBuf,
    /// Absolute path of the unit definition to apply
    pub unit_path: PathBuf,
    /// Extra template variables, passed as `-e key=value`
    #[serde(default)]
    pub extra_vars: BTreeMap<String, String>,
    /// Whether to force privilege-escalation mode on
    pub elevate: bool,
}

/// Captured result of an engine invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    /// Exit code zero is the only success signal the engine gives
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout followed by stderr, for logging a unit's full output
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// Seam between an orchestrator and the external engine.
///
/// `validate` and `ensure_engine` default to the real sudo probe and
/// package-manager bootstrap; test doubles override them along with
/// `run`.
pub trait Invoker: Send + Sync {
    /// Apply one unit; success is exit code zero in the output
    fn run(&self, request: &RunRequest, credential: &Credential) -> Result<RunOutput, RunbookError>;

    /// Check the credential before any unit executes
    fn validate(&self, credential: &Credential) -> Result<(), RunbookError> {
        validate(credential, VALIDATE_TIMEOUT)
    }

    /// Make sure the engine binary exists, installing it if needed
    fn ensure_engine(&self, credential: &Credential) -> Result<(), RunbookError> {
        if engine_present() {
            Ok(())
        } else {
            install_engine(credential)
        }
    }
}

/// Invoker backed by the real `ansible-playbook` binary
#[derive(Debug, Default)]
pub struct AnsibleInvoker {
    /// Upper bound on one invocation; `None` lets the engine block
    /// indefinitely, matching historical behavior
    timeout: Option<Duration>,
}

impl AnsibleInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Invoker for AnsibleInvoker {
    fn run(&self, request: &RunRequest, credential: &Credential) -> Result<RunOutput, RunbookError> {
        let mut cmd = Command::new(ENGINE_BINARY);
        cmd.args(build_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if request.elevate {
            cmd.env(BECOME_PASS_ENV, credential.expose());
        }

        let mut child = cmd.spawn()?;
        let drain = Drain::start(&mut child);

        let status = wait_limited(&mut child, self.timeout)?;
        let Some(status) = status else {
            let _ = child.kill();
            let _ = child.wait();
            // timeout is Some here, otherwise wait_limited blocks forever
            return Err(RunbookError::Timeout(self.timeout.unwrap_or_default()));
        };

        let (stdout, stderr) = drain.join();
        Ok(RunOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}

/// Engine argv for a request; the credential is deliberately absent
fn build_args(request: &RunRequest) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-i".into(),
        request.inventory.clone().into_os_string(),
        request.unit_path.clone().into_os_string(),
    ];
    for (key, value) in &request.extra_vars {
        args.push("-e".into());
        args.push(format!("{key}={value}").into());
    }
    if request.elevate {
        args.push("--become".into());
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RunRequest {
        RunRequest {
            inventory: PathBuf::from("/srv/setup/inventory"),
            unit_path: PathBuf::from("/srv/setup/playbooks/basics/core.yml"),
            extra_vars: BTreeMap::from([(
                "templates_directory".to_string(),
                "/srv/setup/templates".to_string(),
            )]),
            elevate: true,
        }
    }

    #[test]
    fn args_carry_inventory_unit_and_vars() {
        let args = build_args(&request());
        let rendered: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();

        assert_eq!(rendered[0], "-i");
        assert_eq!(rendered[1], "/srv/setup/inventory");
        assert_eq!(rendered[2], "/srv/setup/playbooks/basics/core.yml");
        assert!(rendered.contains(&"-e".to_string()));
        assert!(rendered.contains(&"templates_directory=/srv/setup/templates".to_string()));
        assert_eq!(rendered.last().unwrap(), "--become");
    }

    #[test]
    fn args_never_contain_a_password_flag() {
        let args = build_args(&request());
        for arg in &args {
            let arg = arg.to_string_lossy();
            assert!(!arg.contains("pass"), "credential material in argv: {arg}");
        }
    }

    #[test]
    fn elevate_off_drops_become_flag() {
        let mut req = request();
        req.elevate = false;
        let args = build_args(&req);
        assert!(!args.iter().any(|a| a == "--become"));
    }

    #[test]
    fn combined_output_orders_stdout_first() {
        let output = RunOutput {
            exit_code: 2,
            stdout: "task output".to_string(),
            stderr: "fatal: failed".to_string(),
        };
        assert!(!output.success());
        assert_eq!(output.combined(), "task output\nfatal: failed");
    }

    #[test]
    fn combined_output_handles_empty_streams() {
        let output = RunOutput {
            exit_code: 0,
            stdout: String::new(),
            stderr: "warning".to_string(),
        };
        assert!(output.success());
        assert_eq!(output.combined(), "warning");
    }
}
