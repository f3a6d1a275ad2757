//! Installed-state tracking
//!
//! A flat mapping of playbook name to completion timestamp, persisted
//! as one JSON document. It only suppresses re-auto-selecting already
//! applied essential units; manual re-selection is always allowed.
//! Appended to after every successful unit and rewritten wholesale;
//! reset deletes the file outright.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Persisted record of which units have completed successfully
#[derive(Debug, Clone)]
pub struct InstalledState {
    path: PathBuf,
    completed: BTreeMap<String, DateTime<Utc>>,
}

impl InstalledState {
    /// Load from the default per-user location
    pub fn load() -> Result<Self> {
        Ok(Self::load_from(paths::installed_file()?))
    }

    /// Load from a specific file; missing file means nothing installed
    pub fn load_from(path: PathBuf) -> Self {
        let completed = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(map) => map,
                Err(e) => {
                    log::warn!(
                        "Ignoring corrupt installed-state at {}: {}",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self { path, completed }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.completed.contains_key(name)
    }

    pub fn completed_at(&self, name: &str) -> Option<DateTime<Utc>> {
        self.completed.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    /// Names of all completed units
    pub fn names(&self) -> BTreeSet<String> {
        self.completed.keys().cloned().collect()
    }

    /// Iterate completions in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &DateTime<Utc>)> {
        self.completed.iter()
    }

    /// Record a unit completion at the current time
    pub fn mark_completed(&mut self, name: &str) {
        self.completed.insert(name.to_string(), Utc::now());
    }

    /// Rewrite the whole document
    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create state directory: {}", dir.display())
            })?;
        }
        let body = serde_json::to_string_pretty(&self.completed)
            .context("Failed to serialize installed-state")?;
        fs::write(&self.path, body)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        log::debug!("Saved installed-state to {}", self.path.display());
        Ok(())
    }

    /// Forget everything by deleting the document
    pub fn reset(path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_means_nothing_installed() {
        let dir = TempDir::new().unwrap();
        let state = InstalledState::load_from(dir.path().join("installed.json"));
        assert!(state.is_empty());
        assert!(!state.contains("Core Packages"));
    }

    #[test]
    fn test_mark_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("installed.json");

        let mut state = InstalledState::load_from(path.clone());
        state.mark_completed("Core Packages");
        state.save().unwrap();

        let reloaded = InstalledState::load_from(path);
        assert!(reloaded.contains("Core Packages"));
        assert!(reloaded.completed_at("Core Packages").is_some());
        assert_eq!(reloaded.names().len(), 1);
    }

    #[test]
    fn test_document_is_a_flat_name_to_timestamp_map() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("installed.json");

        let mut state = InstalledState::load_from(path.clone());
        state.mark_completed("Git Setup");
        state.save().unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let stamp = raw.get("Git Setup").unwrap().as_str().unwrap();
        // ISO-8601 with a date/time separator
        assert!(stamp.contains('T'));
        assert!(stamp.parse::<DateTime<Utc>>().is_ok());
    }

    #[test]
    fn test_reset_deletes_the_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("installed.json");

        let mut state = InstalledState::load_from(path.clone());
        state.mark_completed("Core Packages");
        state.save().unwrap();
        assert!(path.exists());

        InstalledState::reset(&path).unwrap();
        assert!(!path.exists());
        // Resetting again is fine
        InstalledState::reset(&path).unwrap();
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("installed.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let state = InstalledState::load_from(path);
        assert!(state.is_empty());
    }
}
