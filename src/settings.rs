//! Settings overlay - base defaults merged with user overrides
//!
//! Two JSON documents live under the config directory: `defaults.json`
//! (written once from the built-in defaults) and `settings.json` (user
//! overrides). User values win key-by-key at the top level; nothing is
//! merged recursively. Both files are created on first access so the
//! user always has something to edit.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::paths;

/// Effective settings after merging the overlay
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the built-in playbook tree (a checkout managed externally)
    pub working_directory: String,

    /// Root of the user-provided playbook tree; unset means no external
    /// units are scanned
    pub external_directory: Option<String>,

    /// Inventory file handed to the engine; defaults to
    /// `<working_directory>/inventory`
    pub inventory_file: Option<String>,

    /// Where per-run logs are written
    pub log_directory: String,

    /// Account the playbooks configure
    pub system_user: String,

    /// Git identity templated into dotfiles
    pub git_name: String,
    pub git_email: String,

    /// Upper bound in seconds for one engine invocation; unset means
    /// the run can block indefinitely on the child process
    pub engine_timeout_secs: Option<u64>,

    /// Gating table: playbook name to the setting keys that must be
    /// non-empty before that playbook becomes selectable
    pub requirements: BTreeMap<String, Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            working_directory: "~/.local/share/regente/source".to_string(),
            external_directory: None,
            inventory_file: None,
            log_directory: "~/.local/state/regente/logs".to_string(),
            system_user: String::new(),
            git_name: String::new(),
            git_email: String::new(),
            engine_timeout_secs: None,
            requirements: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load the merged settings from the default config directory
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_dir()?)
    }

    /// Load the merged settings from a specific config directory
    pub fn load_from(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let defaults_path = dir.join("defaults.json");
        if !defaults_path.exists() {
            let body = serde_json::to_string_pretty(&Settings::default())?;
            fs::write(&defaults_path, body)
                .with_context(|| format!("Could not write {}", defaults_path.display()))?;
            log::debug!("Wrote base defaults to {}", defaults_path.display());
        }

        let user_path = dir.join("settings.json");
        if !user_path.exists() {
            let body = serde_json::to_string_pretty(&minimal_user_overrides())?;
            fs::write(&user_path, body)
                .with_context(|| format!("Could not write {}", user_path.display()))?;
            log::debug!("Wrote initial user settings to {}", user_path.display());
        }

        let base: Value = read_json(&defaults_path)?;
        let user: Value = read_json(&user_path)?;
        let merged = shallow_merge(base, user);

        serde_json::from_value(merged).context("Invalid settings document")
    }

    // ========================================================================
    // Derived paths
    // ========================================================================

    /// Root of the built-in playbook tree
    pub fn working_dir(&self) -> PathBuf {
        paths::expand(&self.working_directory)
    }

    /// Root of the external playbook tree, when configured
    pub fn external_dir(&self) -> Option<PathBuf> {
        self.external_directory
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(paths::expand)
    }

    /// Inventory file for engine invocations
    pub fn inventory_path(&self) -> PathBuf {
        match self.inventory_file.as_deref().filter(|f| !f.is_empty()) {
            Some(file) => paths::expand(file),
            None => self.working_dir().join("inventory"),
        }
    }

    /// Directory per-run logs are written to
    pub fn log_dir(&self) -> PathBuf {
        paths::expand(&self.log_directory)
    }

    /// Built-in category root: `<working>/playbooks/<category>`
    pub fn builtin_category_root(&self, category: &str) -> PathBuf {
        self.working_dir().join("playbooks").join(category)
    }

    /// External category root: `<external>/<category>`
    pub fn external_category_root(&self, category: &str) -> Option<PathBuf> {
        self.external_dir().map(|d| d.join(category))
    }

    /// Template-variable directory for a built-in unit
    pub fn builtin_templates_dir(&self) -> PathBuf {
        self.working_dir().join("templates")
    }

    /// Template-variable directory for an external unit
    pub fn external_templates_dir(&self) -> Option<PathBuf> {
        self.external_dir().map(|d| d.join("templates"))
    }

    /// Engine invocation timeout, when one is configured
    pub fn engine_timeout(&self) -> Option<Duration> {
        self.engine_timeout_secs.map(Duration::from_secs)
    }

    /// Identity values exposed to playbooks as template variables
    pub fn identity_vars(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        if !self.system_user.is_empty() {
            vars.insert("system_user".to_string(), self.system_user.clone());
        }
        if !self.git_name.is_empty() {
            vars.insert("git_name".to_string(), self.git_name.clone());
        }
        if !self.git_email.is_empty() {
            vars.insert("git_email".to_string(), self.git_email.clone());
        }
        vars
    }

    // ========================================================================
    // Requirement gating
    // ========================================================================

    /// Setting keys a named playbook declares as prerequisites
    pub fn required_keys(&self, playbook: &str) -> Option<&[String]> {
        self.requirements.get(playbook).map(Vec::as_slice)
    }

    /// True when every listed key resolves to a non-empty value
    pub fn requirement_met(&self, keys: &[String]) -> bool {
        !keys.is_empty() && keys.iter().all(|k| self.key_non_empty(k))
    }

    /// Check a setting key by name against the merged document
    fn key_non_empty(&self, key: &str) -> bool {
        let Ok(doc) = serde_json::to_value(self) else {
            return false;
        };
        match doc.get(key) {
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        }
    }
}

/// First-run user document: just enough for the common gates
fn minimal_user_overrides() -> Value {
    serde_json::json!({
        "system_user": std::env::var("USER").unwrap_or_default(),
        "git_name": "",
        "git_email": "",
    })
}

fn read_json(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// Top-level key-by-key merge; overlay wins per key
fn shallow_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, file: &str, body: &str) {
        fs::write(dir.join(file), body).unwrap();
    }

    #[test]
    fn test_first_access_creates_both_documents() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(dir.path()).unwrap();

        assert!(dir.path().join("defaults.json").exists());
        assert!(dir.path().join("settings.json").exists());
        assert_eq!(settings.working_directory, "~/.local/share/regente/source");
    }

    #[test]
    fn test_user_overrides_win_key_by_key() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "defaults.json",
            r#"{"working_directory": "/base/tree", "git_name": "base"}"#,
        );
        write(
            dir.path(),
            "settings.json",
            r#"{"git_name": "Alberto"}"#,
        );

        let settings = Settings::load_from(dir.path()).unwrap();
        assert_eq!(settings.working_directory, "/base/tree");
        assert_eq!(settings.git_name, "Alberto");
    }

    #[test]
    fn test_inventory_defaults_under_working_dir() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "defaults.json",
            r#"{"working_directory": "/srv/setup"}"#,
        );
        write(dir.path(), "settings.json", "{}");

        let settings = Settings::load_from(dir.path()).unwrap();
        assert_eq!(settings.inventory_path(), PathBuf::from("/srv/setup/inventory"));
        assert_eq!(
            settings.builtin_category_root("basics"),
            PathBuf::from("/srv/setup/playbooks/basics")
        );
        assert_eq!(
            settings.builtin_templates_dir(),
            PathBuf::from("/srv/setup/templates")
        );
    }

    #[test]
    fn test_external_dir_empty_string_means_unset() {
        let settings = Settings {
            external_directory: Some(String::new()),
            ..Default::default()
        };
        assert!(settings.external_dir().is_none());
        assert!(settings.external_category_root("apps").is_none());
    }

    #[test]
    fn test_requirement_met() {
        let settings = Settings {
            git_name: "Alberto".to_string(),
            git_email: String::new(),
            ..Default::default()
        };

        assert!(settings.requirement_met(&["git_name".to_string()]));
        assert!(!settings.requirement_met(&["git_email".to_string()]));
        assert!(!settings.requirement_met(&["git_name".to_string(), "git_email".to_string()]));
        // An empty key list never gates open
        assert!(!settings.requirement_met(&[]));
        assert!(!settings.requirement_met(&["no_such_key".to_string()]));
    }

    #[test]
    fn test_engine_timeout() {
        let settings = Settings {
            engine_timeout_secs: Some(300),
            ..Default::default()
        };
        assert_eq!(settings.engine_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(Settings::default().engine_timeout(), None);
    }

    #[test]
    fn test_identity_vars_skip_empty_values() {
        let settings = Settings {
            system_user: "alberto".to_string(),
            git_name: "Alberto".to_string(),
            git_email: String::new(),
            ..Default::default()
        };
        let vars = settings.identity_vars();
        assert_eq!(vars.get("system_user").unwrap(), "alberto");
        assert_eq!(vars.get("git_name").unwrap(), "Alberto");
        assert!(!vars.contains_key("git_email"));
    }

    #[test]
    fn test_requirements_table_round_trips() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "defaults.json", "{}");
        write(
            dir.path(),
            "settings.json",
            r#"{"requirements": {"Git Setup": ["git_name", "git_email"]}}"#,
        );

        let settings = Settings::load_from(dir.path()).unwrap();
        assert_eq!(
            settings.required_keys("Git Setup").unwrap().to_vec(),
            vec!["git_name".to_string(), "git_email".to_string()]
        );
        assert!(settings.required_keys("Unknown").is_none());
    }
}
