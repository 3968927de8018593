//! Configuration for the `team-todos` CLI.
//!
//! This module handles the `.todos/config.yaml` file which stores local
//! settings for the command-line client.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file path relative to the base directory.
pub const CONFIG_FILE_PATH: &str = ".todos/config.yaml";

/// Local settings for the CLI client.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TodosConfig {
    /// Path to the task database. None means the default location under
    /// the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,

    /// Whether `list` hides checked tasks by default. Display-only state;
    /// the service never sees it.
    #[serde(default)]
    pub hide_completed: bool,
}

impl TodosConfig {
    /// Load config from a base directory, returning `None` if the file
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_from(base_dir: &Path) -> Result<Option<Self>> {
        let config_path = base_dir.join(CONFIG_FILE_PATH);
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(Some(config))
    }

    /// Save config under a base directory, creating `.todos/` if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to(&self, base_dir: &Path) -> Result<()> {
        let config_path = base_dir.join(CONFIG_FILE_PATH);
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// The database path to use: the configured override, or the default
    /// under the platform-local data directory.
    #[must_use]
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(default_db_path)
    }
}

/// Default database location: `<data dir>/team-todos/todos.sqlite3`, with
/// the current directory as a fallback when no data dir is known.
#[must_use]
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("team-todos")
        .join("todos.sqlite3")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        assert!(TodosConfig::load_from(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let config = TodosConfig {
            db_path: Some(PathBuf::from("/tmp/custom.db")),
            hide_completed: true,
        };
        config.save_to(dir.path()).unwrap();

        let loaded = TodosConfig::load_from(dir.path()).unwrap().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_invalid_yaml_errors() {
        let dir = TempDir::new().unwrap();
        let config_dir = dir.path().join(".todos");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.yaml"), "db_path: [not: a: path").unwrap();

        assert!(TodosConfig::load_from(dir.path()).is_err());
    }

    #[test]
    fn test_resolved_db_path_prefers_override() {
        let config = TodosConfig {
            db_path: Some(PathBuf::from("/tmp/custom.db")),
            hide_completed: false,
        };
        assert_eq!(config.resolved_db_path(), PathBuf::from("/tmp/custom.db"));
    }

    #[test]
    fn test_default_db_path_ends_with_db_file() {
        assert!(default_db_path().ends_with("team-todos/todos.sqlite3"));
    }
}
