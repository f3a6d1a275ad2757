//! Catalog types and persistence
//!
//! The catalog is the authoritative snapshot the selection machine
//! reads: a category-keyed map of playbook records, rebuilt wholesale
//! on every scan and persisted as one JSON document. There is no
//! incremental patching - a regenerate either replaces the whole
//! snapshot or leaves the previous one untouched.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::scanner::Scanner;
use crate::settings::Settings;

/// Provenance of a playbook record; decides which root its path and
/// templates directory resolve under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    BuiltIn,
    External,
}

/// One configuration unit as discovered by the scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybookRecord {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Auto-selected at session start unless already installed
    #[serde(default)]
    pub essential: bool,

    /// Tie-break for essential units in the basics category; absent
    /// sorts after every explicit order
    #[serde(default)]
    pub essential_order: Option<i32>,

    /// When true, selection is gated on the requirements table
    #[serde(default)]
    pub requires_config: bool,

    /// Definition file location, relative to its source root
    pub path: String,

    pub source: Source,

    pub category: String,
}

impl PlaybookRecord {
    /// Selection key within a catalog snapshot
    pub fn key(&self) -> (String, String) {
        (self.category.clone(), self.name.clone())
    }
}

/// One catalog category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub playbooks: Vec<PlaybookRecord>,
}

/// Category-keyed catalog; BTreeMap keeps serialization deterministic
pub type Catalog = BTreeMap<String, Category>;

/// Owns the current catalog snapshot and its on-disk copy
pub struct CatalogStore {
    path: PathBuf,
    catalog: Catalog,
}

impl CatalogStore {
    /// Open the store at the default per-user location
    pub fn open() -> Result<Self> {
        Ok(Self::open_at(crate::paths::catalog_file()?))
    }

    /// Open the store backed by a specific file; a missing or corrupt
    /// document starts empty rather than failing
    pub fn open_at(path: PathBuf) -> Self {
        let catalog = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(catalog) => catalog,
                Err(e) => {
                    log::warn!("Ignoring corrupt catalog at {}: {}", path.display(), e);
                    Catalog::new()
                }
            },
            Err(_) => Catalog::new(),
        };
        Self { path, catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.values().all(|c| c.playbooks.is_empty())
    }

    /// Total number of records across all categories
    pub fn record_count(&self) -> usize {
        self.catalog.values().map(|c| c.playbooks.len()).sum()
    }

    pub fn find_record(&self, category: &str, name: &str) -> Option<&PlaybookRecord> {
        self.catalog
            .get(category)?
            .playbooks
            .iter()
            .find(|p| p.name == name)
    }

    /// Re-scan the playbook trees and persist the result.
    ///
    /// On a persistence failure the previous in-memory catalog stays
    /// current and the error is returned for reporting; the store is
    /// still usable.
    pub fn regenerate(&mut self, settings: &Settings) -> Result<&Catalog> {
        let fresh = Scanner::new(settings).scan();

        if let Err(e) = persist(&self.path, &fresh) {
            log::error!("Failed to persist catalog: {e:#}");
            return Err(e);
        }

        self.catalog = fresh;
        log::info!(
            "Catalog regenerated: {} playbooks in {} categories",
            self.record_count(),
            self.catalog.len()
        );
        Ok(&self.catalog)
    }
}

fn persist(path: &Path, catalog: &Catalog) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
    }
    let body = serde_json::to_string_pretty(catalog).context("Failed to serialize catalog")?;
    fs::write(path, body).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(category: &str, name: &str) -> PlaybookRecord {
        PlaybookRecord {
            name: name.to_string(),
            description: format!("{name} playbook"),
            essential: false,
            essential_order: None,
            requires_config: false,
            path: format!("playbooks/{category}/{name}.yml"),
            source: Source::BuiltIn,
            category: category.to_string(),
        }
    }

    #[test]
    fn test_record_round_trips_all_fields() {
        let mut original = record("basics", "Core Packages");
        original.essential = true;
        original.essential_order = Some(2);
        original.requires_config = true;
        original.source = Source::External;

        let body = serde_json::to_string(&original).unwrap();
        let back: PlaybookRecord = serde_json::from_str(&body).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn test_open_at_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::open_at(dir.path().join("catalog.json"));
        assert!(store.is_empty());
        assert_eq!(store.record_count(), 0);
    }

    #[test]
    fn test_open_at_corrupt_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, "not json").unwrap();

        let store = CatalogStore::open_at(path);
        assert!(store.is_empty());
    }

    #[test]
    fn test_catalog_document_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");

        let mut catalog = Catalog::new();
        catalog.insert(
            "basics".to_string(),
            Category {
                description: "Baseline system setup".to_string(),
                playbooks: vec![record("basics", "Core Packages")],
            },
        );
        persist(&path, &catalog).unwrap();

        let store = CatalogStore::open_at(path);
        assert_eq!(store.catalog(), &catalog);
        assert!(store.find_record("basics", "Core Packages").is_some());
        assert!(store.find_record("basics", "Missing").is_none());
    }
}
