//! Selection state machine
//!
//! Owns the set of chosen `(category, name)` keys over a catalog
//! snapshot. Every mutation ends with a rebuild of the derived display
//! list, which is also where requirement gating is enforced: a gated
//! record whose required setting keys are not all non-empty is marked
//! disabled and force-removed from the selection, even if an earlier
//! state had it selected.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{Catalog, PlaybookRecord};
use crate::settings::Settings;

/// Gating annotation for one display entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// The record does not declare `requires_config`
    NotGated,
    /// All required setting keys are non-empty
    Satisfied,
    /// At least one key is empty, or no keys are declared for the name
    NotSatisfied,
}

/// One row of the derived per-category display list
#[derive(Debug, Clone)]
pub struct DisplayEntry {
    pub record: PlaybookRecord,
    pub selected: bool,
    pub enabled: bool,
    pub requirement: Requirement,
}

/// Selection over a catalog snapshot, seeded with essential units
pub struct SelectionMachine {
    catalog: Catalog,
    settings: Settings,
    installed: BTreeSet<String>,
    selected: BTreeSet<(String, String)>,
    display: BTreeMap<String, Vec<DisplayEntry>>,
}

impl SelectionMachine {
    /// Create the session selection: starts empty, then seeds essential
    /// units that are not yet installed
    pub fn new(catalog: Catalog, settings: Settings, installed: BTreeSet<String>) -> Self {
        let mut machine = Self {
            catalog,
            settings,
            installed,
            selected: BTreeSet::new(),
            display: BTreeMap::new(),
        };
        machine.select_essential();
        machine
    }

    /// Derived per-category display list
    pub fn display(&self) -> &BTreeMap<String, Vec<DisplayEntry>> {
        &self.display
    }

    pub fn is_selected(&self, category: &str, name: &str) -> bool {
        self.selected
            .contains(&(category.to_string(), name.to_string()))
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Select every record in a category; gating trims unmet ones
    pub fn select_all(&mut self, category: &str) {
        if let Some(cat) = self.catalog.get(category) {
            for record in &cat.playbooks {
                self.selected.insert(record.key());
            }
        }
        self.rebuild();
    }

    /// Drop every record of a category from the selection
    pub fn deselect_all(&mut self, category: &str) {
        self.selected.retain(|(c, _)| c != category);
        self.rebuild();
    }

    /// Clear the whole selection
    pub fn select_none(&mut self) {
        self.selected.clear();
        self.rebuild();
    }

    /// Flip one record's membership; no-op when the record is
    /// gated-disabled or unknown. Returns whether anything changed.
    pub fn toggle(&mut self, category: &str, name: &str) -> bool {
        let Some(record) = self
            .catalog
            .get(category)
            .and_then(|c| c.playbooks.iter().find(|p| p.name == name))
        else {
            log::debug!("Toggle of unknown playbook {category}/{name}");
            return false;
        };

        if self.requirement_state(record) == Requirement::NotSatisfied {
            log::debug!("Toggle ignored, requirements not satisfied: {name}");
            return false;
        }

        let key = record.key();
        if !self.selected.remove(&key) {
            self.selected.insert(key);
        }
        self.rebuild();
        true
    }

    /// Add every essential record whose name has not completed yet.
    /// Invoked once at session start; callable again after a reset.
    pub fn select_essential(&mut self) {
        for cat in self.catalog.values() {
            for record in &cat.playbooks {
                if record.essential && !self.installed.contains(&record.name) {
                    self.selected.insert(record.key());
                }
            }
        }
        self.rebuild();
    }

    /// Remove all essential records from the selection; the caller is
    /// expected to have confirmed this separately
    pub fn remove_essential(&mut self) {
        let essential: Vec<(String, String)> = self
            .catalog
            .values()
            .flat_map(|c| c.playbooks.iter())
            .filter(|r| r.essential)
            .map(PlaybookRecord::key)
            .collect();
        for key in essential {
            self.selected.remove(&key);
        }
        self.rebuild();
    }

    /// Swap in fresh settings (the gating inputs) and re-derive
    pub fn refresh_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.rebuild();
    }

    /// Records for the current membership, in catalog order
    pub fn resolve(&self) -> Vec<PlaybookRecord> {
        self.catalog
            .values()
            .flat_map(|c| c.playbooks.iter())
            .filter(|r| self.selected.contains(&r.key()))
            .cloned()
            .collect()
    }

    fn requirement_state(&self, record: &PlaybookRecord) -> Requirement {
        if !record.requires_config {
            return Requirement::NotGated;
        }
        match self.settings.required_keys(&record.name) {
            Some(keys) if self.settings.requirement_met(keys) => Requirement::Satisfied,
            // No declared keys leaves the gate unsatisfiable
            _ => Requirement::NotSatisfied,
        }
    }

    /// Recompute the display list; the single place gating is enforced
    fn rebuild(&mut self) {
        let mut display = BTreeMap::new();

        for (key, cat) in &self.catalog {
            let mut entries = Vec::with_capacity(cat.playbooks.len());
            for record in &cat.playbooks {
                let requirement = self.requirement_state(record);
                let enabled = requirement != Requirement::NotSatisfied;
                if !enabled {
                    self.selected.remove(&record.key());
                }
                entries.push(DisplayEntry {
                    selected: self.selected.contains(&record.key()),
                    enabled,
                    requirement,
                    record: record.clone(),
                });
            }
            display.insert(key.clone(), entries);
        }

        self.display = display;
    }
}

// ============================================================================
// Tests
// ============================================================================
