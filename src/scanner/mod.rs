//! Playbook metadata scanner
//!
//! Walks the category roots of the built-in playbook tree (and, for
//! extensible categories, the external tree) and turns annotated unit
//! files into a fresh [`Catalog`] snapshot. Unreadable files are
//! skipped with a warning; a missing external directory is a no-op.

pub mod header;

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::catalog::{Catalog, Category, PlaybookRecord, Source};
use crate::settings::Settings;

/// Fixed catalog taxonomy; descriptions render in the catalog document
pub struct CategorySpec {
    pub key: &'static str,
    pub description: &'static str,
    /// Extensible categories also pick up units from the external tree
    pub extensible: bool,
}

pub const CATEGORIES: &[CategorySpec] = &[
    CategorySpec {
        key: "basics",
        description: "Baseline system setup",
        extensible: false,
    },
    CategorySpec {
        key: "apps",
        description: "Desktop applications",
        extensible: true,
    },
    CategorySpec {
        key: "development",
        description: "Developer tooling",
        extensible: true,
    },
    CategorySpec {
        key: "customization",
        description: "Desktop customization",
        extensible: false,
    },
];

/// Scanner over the configured playbook roots
pub struct Scanner<'a> {
    settings: &'a Settings,
}

impl<'a> Scanner<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Build a complete catalog snapshot.
    ///
    /// Built-in records precede external ones within a category, and a
    /// later record with an already-seen name is dropped so each
    /// `(category, name)` pair stays unique.
    pub fn scan(&self) -> Catalog {
        let mut catalog = Catalog::new();

        for spec in CATEGORIES {
            let mut playbooks = Vec::new();

            let builtin_root = self.settings.builtin_category_root(spec.key);
            scan_root(
                &builtin_root,
                spec.key,
                Source::BuiltIn,
                &format!("playbooks/{}", spec.key),
                &mut playbooks,
            );

            if spec.extensible {
                if let Some(external_root) = self.settings.external_category_root(spec.key) {
                    // Missing external directory is expected, not an error
                    if external_root.is_dir() {
                        scan_root(
                            &external_root,
                            spec.key,
                            Source::External,
                            spec.key,
                            &mut playbooks,
                        );
                    }
                }
            }

            dedupe_by_name(spec.key, &mut playbooks);

            catalog.insert(
                spec.key.to_string(),
                Category {
                    description: spec.description.to_string(),
                    playbooks,
                },
            );
        }

        catalog
    }
}

/// Scan one category root; `rel_prefix` is the stored path prefix
/// relative to the source root
fn scan_root(
    root: &Path,
    category: &str,
    source: Source,
    rel_prefix: &str,
    out: &mut Vec<PlaybookRecord>,
) {
    if !root.is_dir() {
        log::debug!("Skipping missing category root: {}", root.display());
        return;
    }

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        let path = entry.path();
        if !is_unit_file(path) {
            continue;
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                log::warn!("Skipping unreadable playbook {}: {}", path.display(), e);
                continue;
            }
        };

        let header = header::parse_header(&content);
        let Some(name) = header.name else {
            log::debug!("No Name annotation in {}, skipping", path.display());
            continue;
        };

        let file_name = entry.file_name().to_string_lossy().into_owned();
        out.push(PlaybookRecord {
            name,
            description: header.description,
            essential: header.essential,
            essential_order: header.essential_order,
            requires_config: header.requires_config,
            path: format!("{rel_prefix}/{file_name}"),
            source,
            category: category.to_string(),
        });
    }
}

fn is_unit_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext == "yml" || ext == "yaml")
}

/// Keep the first record per name; built-in entries come first, so a
/// clashing external unit loses
fn dedupe_by_name(category: &str, playbooks: &mut Vec<PlaybookRecord>) {
    let mut seen = BTreeSet::new();
    playbooks.retain(|record| {
        if seen.insert(record.name.clone()) {
            true
        } else {
            log::warn!(
                "Duplicate playbook name {:?} in category {category}, keeping the first",
                record.name
            );
            false
        }
    });
}

// ============================================================================
// Tests
// ============================================================================
