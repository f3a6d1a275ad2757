//! Centralized path resolution for regente
//!
//! Fixed per-user locations for the settings overlay, the persisted
//! catalog, and the installed-state document, with environment variable
//! overrides so the whole tree can live inside a dotfiles repository.
//!
//! # Environment Variables
//!
//! - `REGENTE_CONFIG_DIR` - Override config directory
//! - `REGENTE_STATE_DIR` - Override state directory
//!
//! # Path Resolution Priority
//!
//! For config_dir(): env override, then `XDG_CONFIG_HOME/regente`, then
//! `~/.config/regente`. For state_dir(): env override, then
//! `XDG_STATE_HOME/regente`, then `~/.local/state/regente`.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "REGENTE_CONFIG_DIR";

/// Environment variable for state directory override
pub const ENV_STATE_DIR: &str = "REGENTE_STATE_DIR";

/// Get the regente config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!("Using config dir from {}: {}", ENV_CONFIG_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("regente");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("regente");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Get the regente state directory path
pub fn state_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_STATE_DIR) {
        let path = expand(&dir);
        log::debug!("Using state dir from {}: {}", ENV_STATE_DIR, path.display());
        return Ok(path);
    }

    if let Ok(xdg_state) = std::env::var("XDG_STATE_HOME") {
        let path = PathBuf::from(xdg_state).join("regente");
        log::debug!("Using XDG_STATE_HOME: {}", path.display());
        return Ok(path);
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".local").join("state").join("regente");
    log::debug!("Using default state dir: {}", path.display());
    Ok(path)
}

/// Location of the persisted catalog document
pub fn catalog_file() -> Result<PathBuf> {
    Ok(state_dir()?.join("catalog.json"))
}

/// Location of the installed-state document
pub fn installed_file() -> Result<PathBuf> {
    Ok(state_dir()?.join("installed.json"))
}

/// Expand ~ and environment variables in a path string.
///
/// This is the canonical path expansion function for regente. All
/// modules should use this instead of calling shellexpand directly.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    /// Helper to run a test with temporary env var
    ///
    /// # Safety
    /// Uses unsafe env::set_var/remove_var; only safe in single-threaded
    /// test contexts.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::set_var(key, value) };
        let result = f();
        match original {
            // SAFETY: Tests run in isolation
            Some(v) => unsafe { env::set_var(key, v) },
            None => unsafe { env::remove_var(key) },
        }
        result
    }

    /// Helper to run a test with env var removed
    fn without_env_var<F, R>(key: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let original = env::var(key).ok();
        // SAFETY: Tests run in isolation and don't read env vars concurrently
        unsafe { env::remove_var(key) };
        let result = f();
        if let Some(v) = original {
            // SAFETY: Tests run in isolation
            unsafe { env::set_var(key, v) };
        }
        result
    }

    #[test]
    fn test_config_dir_env_override() {
        with_env_var(ENV_CONFIG_DIR, "/custom/config/path", || {
            let result = config_dir().unwrap();
            assert_eq!(result, PathBuf::from("/custom/config/path"));
        });
    }

    #[test]
    fn test_config_dir_env_override_with_tilde() {
        let home = dirs::home_dir().unwrap();
        let expected = home.join("dotfiles").join("regente-tilde-test");
        with_env_var(ENV_CONFIG_DIR, "~/dotfiles/regente-tilde-test", || {
            let result = config_dir().unwrap();
            assert_eq!(result, expected);
        });
    }

    #[test]
    fn test_state_dir_env_override() {
        with_env_var(ENV_STATE_DIR, "/custom/state/path", || {
            let result = state_dir().unwrap();
            assert_eq!(result, PathBuf::from("/custom/state/path"));
        });
    }

    #[test]
    fn test_xdg_state_home() {
        without_env_var(ENV_STATE_DIR, || {
            with_env_var("XDG_STATE_HOME", "/tmp/xdg-state-test", || {
                let result = state_dir().unwrap();
                assert_eq!(result, PathBuf::from("/tmp/xdg-state-test/regente"));
            });
        });
    }

    #[test]
    fn test_state_files_live_under_state_dir() {
        with_env_var(ENV_STATE_DIR, "/custom/state/path", || {
            assert_eq!(
                catalog_file().unwrap(),
                PathBuf::from("/custom/state/path/catalog.json")
            );
            assert_eq!(
                installed_file().unwrap(),
                PathBuf::from("/custom/state/path/installed.json")
            );
        });
    }

    #[test]
    fn test_expand_with_tilde() {
        let result = expand("~/test/path");
        let home = dirs::home_dir().unwrap();
        assert_eq!(result, home.join("test").join("path"));
    }

    #[test]
    fn test_expand_absolute() {
        let result = expand("/absolute/path");
        assert_eq!(result, PathBuf::from("/absolute/path"));
    }

    #[cfg(unix)]
    #[test]
    fn test_default_state_dir_unix() {
        without_env_var(ENV_STATE_DIR, || {
            without_env_var("XDG_STATE_HOME", || {
                let result = state_dir().unwrap();
                let home = dirs::home_dir().unwrap();
                assert_eq!(result, home.join(".local").join("state").join("regente"));
            });
        });
    }
}
