//! Apply command - resolve the selection and drain it through the
//! orchestrator, rendering run events as terminal progress

use std::sync::mpsc;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use runbook::{AnsibleInvoker, Credential, Invoker};

use crate::catalog::CatalogStore;
use crate::cli::ApplyArgs;
use crate::engine::{self, Failure, Orchestrator, RunEvent};
use crate::selection::SelectionMachine;
use crate::settings::Settings;
use crate::state::InstalledState;
use crate::{paths, ui};
use crate::Context as AppContext;

/// Environment variable consulted before prompting for the password
const ENV_BECOME_PASS: &str = "REGENTE_BECOME_PASS";

pub fn run(ctx: &AppContext, args: ApplyArgs) -> Result<()> {
    let settings = Settings::load()?;
    let store = CatalogStore::open()?;
    if store.is_empty() {
        bail!("catalog is empty - run `regente refresh` first");
    }

    let installed = InstalledState::load()?;
    let mut machine =
        SelectionMachine::new(store.catalog().clone(), settings.clone(), installed.names());

    if args.skip_essential {
        machine.remove_essential();
    }
    for category in &args.category {
        machine.select_all(category);
    }
    for target in &args.only {
        let (category, name) = target
            .split_once('/')
            .with_context(|| format!("--only expects category/name, got {target:?}"))?;
        if !machine.toggle(category, name) {
            if store.find_record(category, name).is_none() {
                ui::warn(&format!("Unknown playbook: {target}"));
            } else {
                ui::warn(&format!("Cannot select {target}: requirements not satisfied"));
            }
        }
    }

    let queue = engine::execution_order(machine.resolve());
    if queue.is_empty() {
        ui::info("Nothing selected.");
        return Ok(());
    }

    ui::header("Execution plan");
    for (i, unit) in queue.iter().enumerate() {
        ui::step(i + 1, queue.len(), &format!("{} ({})", unit.name, unit.category));
    }
    println!();

    if args.dry_run {
        ui::info("Dry run - nothing executed.");
        return Ok(());
    }

    if !args.yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Apply {} playbook(s)?", queue.len()))
            .default(true)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            ui::error("Aborted");
            return Ok(());
        }
    }

    let credential = obtain_credential()?;
    let invoker: Arc<dyn Invoker> =
        Arc::new(AnsibleInvoker::with_timeout(settings.engine_timeout()));
    let orchestrator = Orchestrator::new(settings, invoker, paths::installed_file()?);

    let (tx, rx) = mpsc::channel();
    let handle = orchestrator.start(queue, credential, tx)?;

    let mut bar: Option<ProgressBar> = None;
    let mut failure: Option<Failure> = None;

    for event in rx {
        match event {
            RunEvent::Started { total } => {
                bar = Some(progress_bar(total as u64));
            }
            RunEvent::UnitStarted { index, total, name } => {
                if let Some(bar) = &bar {
                    bar.set_message(format!("[{}/{}] {}", index + 1, total, name));
                }
            }
            RunEvent::UnitOutput { name, output } => {
                if ctx.verbose > 0 {
                    for line in output.lines() {
                        ui::dim(line);
                    }
                } else {
                    log::debug!("{name} output:\n{output}");
                }
            }
            RunEvent::UnitFinished { .. } => {
                if let Some(bar) = &bar {
                    bar.inc(1);
                }
            }
            RunEvent::Finished => {
                if let Some(bar) = bar.take() {
                    bar.finish_and_clear();
                }
            }
            RunEvent::Failed(f) => {
                if let Some(bar) = bar.take() {
                    bar.abandon();
                }
                failure = Some(f);
            }
        }
    }

    handle
        .join()
        .map_err(|_| anyhow::anyhow!("run worker panicked"))?;

    if let Some(failure) = failure {
        if let Some(unit) = &failure.unit {
            ui::error(&format!("Run aborted at {unit:?}"));
        }
        if !ctx.quiet && !failure.detail.is_empty() {
            for line in failure.detail.lines() {
                ui::dim(line);
            }
        }
        bail!(
            "run failed{}",
            failure
                .unit
                .as_deref()
                .map(|u| format!(" at unit {u:?}"))
                .unwrap_or_default()
        );
    }

    ui::success("All playbooks applied successfully!");
    Ok(())
}

/// Take the become password from the environment or prompt for it;
/// either way it only ever lives inside a zeroizing wrapper
fn obtain_credential() -> Result<Credential> {
    if let Ok(pass) = std::env::var(ENV_BECOME_PASS) {
        log::debug!("Using become password from {ENV_BECOME_PASS}");
        return Ok(Credential::new(pass));
    }

    let pass = dialoguer::Password::new()
        .with_prompt("Become password")
        .interact()
        .context("Failed to read password")?;
    Ok(Credential::new(pass))
}

fn progress_bar(total: u64) -> ProgressBar {
    let style = ProgressStyle::with_template("  {bar:30.cyan/dim} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(total).with_style(style)
}
