//! Installed-state inspection and reset

use anyhow::{Context, Result};

use crate::state::InstalledState;
use crate::Context as AppContext;
use crate::{paths, ui};

pub fn list(_ctx: &AppContext) -> Result<()> {
    let state = InstalledState::load()?;
    if state.is_empty() {
        ui::info("No playbooks recorded as installed.");
        return Ok(());
    }

    ui::header("Installed playbooks");
    for (name, at) in state.iter() {
        ui::kv(name, &at.format("%Y-%m-%d %H:%M UTC").to_string());
    }
    Ok(())
}

pub fn reset(_ctx: &AppContext, yes: bool) -> Result<()> {
    if !yes {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt("Forget every completed playbook? Essential units will be re-selected.")
            .default(false)
            .interact()
            .context("Failed to read confirmation")?;
        if !confirmed {
            ui::error("Aborted");
            return Ok(());
        }
    }

    InstalledState::reset(&paths::installed_file()?)?;
    ui::success("Installed-state cleared.");
    Ok(())
}
