//! Catalog maintenance - refresh and list

use anyhow::Result;
use colored::Colorize;

use crate::catalog::CatalogStore;
use crate::selection::{Requirement, SelectionMachine};
use crate::settings::Settings;
use crate::state::InstalledState;
use crate::ui;
use crate::Context as AppContext;

/// Re-scan the playbook trees and persist a fresh catalog snapshot
pub fn refresh(_ctx: &AppContext) -> Result<()> {
    let settings = Settings::load()?;
    let mut store = CatalogStore::open()?;
    store.regenerate(&settings)?;

    ui::success(&format!(
        "Catalog rebuilt: {} playbooks in {} categories",
        store.record_count(),
        store.catalog().len()
    ));
    Ok(())
}

/// Render the catalog with selection and gating annotations
pub fn list(ctx: &AppContext, category: Option<&str>) -> Result<()> {
    let settings = Settings::load()?;
    let store = CatalogStore::open()?;

    if store.is_empty() {
        ui::warn("Catalog is empty - run `regente refresh` first.");
        return Ok(());
    }

    let installed = InstalledState::load()?;
    let machine = SelectionMachine::new(store.catalog().clone(), settings, installed.names());

    for (key, entries) in machine.display() {
        if category.is_some_and(|c| c != key.as_str()) {
            continue;
        }

        ui::section(key);
        if entries.is_empty() {
            ui::dim("(no playbooks)");
            continue;
        }

        for entry in entries {
            let marker = if entry.selected { "[x]" } else { "[ ]" };
            let name = if entry.enabled {
                entry.record.name.normal()
            } else {
                entry.record.name.dimmed()
            };

            let mut notes = Vec::new();
            if entry.record.essential {
                notes.push("essential".to_string());
            }
            if let Some(at) = installed.completed_at(&entry.record.name) {
                notes.push(format!("installed {}", at.format("%Y-%m-%d")));
            }
            match entry.requirement {
                Requirement::Satisfied => notes.push("requirements satisfied".to_string()),
                Requirement::NotSatisfied => {
                    notes.push("requirements not satisfied".to_string());
                }
                Requirement::NotGated => {}
            }

            let suffix = if notes.is_empty() {
                String::new()
            } else {
                format!(" ({})", notes.join(", ")).dimmed().to_string()
            };
            println!("  {marker} {name}{suffix}");

            if ctx.verbose > 0 && !entry.record.description.is_empty() {
                ui::dim(&format!("    {}", entry.record.description));
            }
        }
    }

    Ok(())
}
