//! Execution orchestrator
//!
//! Sequences the resolved selection, runs each unit through the engine
//! on one background worker, records successes immediately, and stops
//! at the first failure. At most one run may be active: a start while
//! `Running` is rejected outright, it never queues.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use thiserror::Error;

use runbook::{Credential, Invoker, RunRequest};

use crate::catalog::{PlaybookRecord, Source};
use crate::settings::Settings;
use crate::state::InstalledState;

use super::events::{Failure, FailureKind, RunEvent};

/// Essential basics units without an explicit order sort last
const UNORDERED_ESSENTIAL: i32 = 999;

/// Orchestration run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
}

/// Errors returned synchronously from `start`; everything after the
/// worker is spawned arrives as a [`RunEvent`]
#[derive(Debug, Error)]
pub enum RunError {
    #[error("a run is already in progress")]
    AlreadyRunning,

    #[error("failed to spawn run worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Single-flight executor over an engine invoker
pub struct Orchestrator {
    state: Arc<Mutex<RunState>>,
    invoker: Arc<dyn Invoker>,
    settings: Settings,
    installed_path: PathBuf,
}

impl Orchestrator {
    pub fn new(settings: Settings, invoker: Arc<dyn Invoker>, installed_path: PathBuf) -> Self {
        Self {
            state: Arc::new(Mutex::new(RunState::Idle)),
            invoker,
            settings,
            installed_path,
        }
    }

    /// Current run state; the triggering surface is expected to disable
    /// selection edits while this reports `Running`
    pub fn state(&self) -> RunState {
        *lock_state(&self.state)
    }

    /// Order the selection and drain it on a background worker.
    ///
    /// Rejected with [`RunError::AlreadyRunning`] while a run is in
    /// flight; the in-flight run is left untouched. Observations arrive
    /// on `events`; the returned handle joins the worker.
    pub fn start(
        &self,
        selection: Vec<PlaybookRecord>,
        credential: Credential,
        events: Sender<RunEvent>,
    ) -> Result<JoinHandle<()>, RunError> {
        {
            let mut state = lock_state(&self.state);
            if *state == RunState::Running {
                return Err(RunError::AlreadyRunning);
            }
            *state = RunState::Running;
        }

        let worker = Worker {
            state: Arc::clone(&self.state),
            invoker: Arc::clone(&self.invoker),
            settings: self.settings.clone(),
            installed_path: self.installed_path.clone(),
            queue: execution_order(selection),
            credential,
            events,
        };

        match thread::Builder::new()
            .name("regente-run".to_string())
            .spawn(move || worker.run())
        {
            Ok(handle) => Ok(handle),
            Err(e) => {
                *lock_state(&self.state) = RunState::Idle;
                Err(RunError::Spawn(e))
            }
        }
    }
}

/// Stable-sort the queue: essential basics first by explicit order,
/// everything else afterward in its original relative order
pub fn execution_order(mut selection: Vec<PlaybookRecord>) -> Vec<PlaybookRecord> {
    selection.sort_by_key(sort_key);
    selection
}

fn sort_key(record: &PlaybookRecord) -> (u8, i32) {
    if record.category == "basics" && record.essential {
        (0, record.essential_order.unwrap_or(UNORDERED_ESSENTIAL))
    } else {
        (1, 0)
    }
}

fn lock_state(state: &Arc<Mutex<RunState>>) -> MutexGuard<'_, RunState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Flips the shared state back to Idle when the worker ends, panics
/// included
struct IdleGuard(Arc<Mutex<RunState>>);

impl Drop for IdleGuard {
    fn drop(&mut self) {
        *lock_state(&self.0) = RunState::Idle;
    }
}

struct Worker {
    state: Arc<Mutex<RunState>>,
    invoker: Arc<dyn Invoker>,
    settings: Settings,
    installed_path: PathBuf,
    queue: Vec<PlaybookRecord>,
    credential: Credential,
    events: Sender<RunEvent>,
}

impl Worker {
    fn run(self) {
        let _guard = IdleGuard(Arc::clone(&self.state));
        match self.execute() {
            Ok(events) => {
                let _ = events.send(RunEvent::Finished);
            }
            Err((events, failure)) => {
                log::error!(
                    "Run aborted ({:?}){}: {}",
                    failure.kind,
                    failure
                        .unit
                        .as_deref()
                        .map(|u| format!(" at unit {u:?}"))
                        .unwrap_or_default(),
                    failure.detail
                );
                let _ = events.send(RunEvent::Failed(failure));
            }
        }
    }

    fn execute(self) -> Result<Sender<RunEvent>, (Sender<RunEvent>, Failure)> {
        let Self {
            invoker,
            settings,
            installed_path,
            queue,
            credential,
            events,
            ..
        } = self;

        if let Err(e) = invoker.validate(&credential) {
            return Err((events, Failure::new(FailureKind::Credential, None, e.to_string())));
        }
        if let Err(e) = invoker.ensure_engine(&credential) {
            return Err((events, Failure::new(FailureKind::Bootstrap, None, e.to_string())));
        }

        let total = queue.len();
        let _ = events.send(RunEvent::Started { total });

        let mut installed = InstalledState::load_from(installed_path);
        let mut run_log = RunLog::open(&settings);

        for (index, unit) in queue.iter().enumerate() {
            let _ = events.send(RunEvent::UnitStarted {
                index,
                total,
                name: unit.name.clone(),
            });

            let (unit_path, templates_dir) = match resolve_unit(&settings, unit) {
                Ok(resolved) => resolved,
                Err(detail) => {
                    return Err((
                        events,
                        Failure::new(FailureKind::MissingDefinition, Some(unit.name.as_str()), detail),
                    ));
                }
            };

            let mut extra_vars: BTreeMap<String, String> = settings.identity_vars();
            extra_vars.insert(
                "templates_directory".to_string(),
                templates_dir.display().to_string(),
            );

            let request = RunRequest {
                inventory: settings.inventory_path(),
                unit_path,
                extra_vars,
                elevate: true,
            };

            let output = match invoker.run(&request, &credential) {
                Ok(output) => output,
                Err(e) => {
                    return Err((
                        events,
                        Failure::new(FailureKind::Engine, Some(unit.name.as_str()), e.to_string()),
                    ));
                }
            };

            let combined = output.combined();
            run_log.append(&unit.name, &combined);
            let _ = events.send(RunEvent::UnitOutput {
                name: unit.name.clone(),
                output: combined.clone(),
            });

            if output.success() {
                // One unit's success must survive a crash before the
                // next unit runs
                installed.mark_completed(&unit.name);
                if let Err(e) = installed.save() {
                    log::error!(
                        "Could not persist installed-state after {:?}; the unit may be \
                         re-selected next session: {e:#}",
                        unit.name
                    );
                }
                let _ = events.send(RunEvent::UnitFinished {
                    name: unit.name.clone(),
                });
            } else {
                log::error!("Unit {:?} failed:\n{combined}", unit.name);
                return Err((
                    events,
                    Failure::new(FailureKind::Unit, Some(unit.name.as_str()), combined),
                ));
            }
        }

        Ok(events)
    }
}

/// Resolve the definition path and templates directory for a unit by
/// its provenance
fn resolve_unit(
    settings: &Settings,
    unit: &PlaybookRecord,
) -> Result<(PathBuf, PathBuf), String> {
    let (root, templates) = match unit.source {
        Source::BuiltIn => (settings.working_dir(), settings.builtin_templates_dir()),
        Source::External => {
            let Some(root) = settings.external_dir() else {
                return Err("external source directory is not configured".to_string());
            };
            let Some(templates) = settings.external_templates_dir() else {
                return Err("external source directory is not configured".to_string());
            };
            (root, templates)
        }
    };

    let unit_path = root.join(&unit.path);
    if !unit_path.is_file() {
        return Err(format!("definition file not found: {}", unit_path.display()));
    }
    Ok((unit_path, templates))
}

/// Per-run log file under the configured log directory; any IO problem
/// degrades to logging-only, never aborts the run
struct RunLog {
    file: Option<fs::File>,
}

impl RunLog {
    fn open(settings: &Settings) -> Self {
        let dir = settings.log_dir();
        if let Err(e) = fs::create_dir_all(&dir) {
            log::warn!("Could not create log directory {}: {}", dir.display(), e);
            return Self { file: None };
        }

        let path = dir.join(format!(
            "run-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));
        match fs::File::create(&path) {
            Ok(file) => {
                log::info!("Run log: {}", path.display());
                Self { file: Some(file) }
            }
            Err(e) => {
                log::warn!("Could not create run log {}: {}", path.display(), e);
                Self { file: None }
            }
        }
    }

    fn append(&mut self, unit: &str, output: &str) {
        if let Some(file) = self.file.as_mut() {
            let _ = writeln!(file, "==== {unit} ====\n{output}\n");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
