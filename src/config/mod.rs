//! Configuration management for cistep

pub mod schema;

pub use schema::Config;

use crate::error::{CistepError, CistepResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File name looked up at the workspace root
pub const CONFIG_FILE_NAME: &str = ".cistep.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
    explicit: bool,
}

impl ConfigManager {
    /// Config manager for `.cistep.toml` in the given workspace
    pub fn for_workspace(workspace: &Path) -> Self {
        Self {
            config_path: workspace.join(CONFIG_FILE_NAME),
            explicit: false,
        }
    }

    /// Create a config manager with a custom path (must exist)
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            config_path: path,
            explicit: true,
        }
    }

    /// Default directory of the local cache backend
    pub fn default_cache_dir() -> PathBuf {
        std::env::var_os("RUNNER_TOOL_CACHE")
            .map(PathBuf::from)
            .or_else(dirs::cache_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cistep")
    }

    /// Load configuration, falling back to defaults if the workspace has none
    pub async fn load(&self) -> CistepResult<Config> {
        if !self.config_path.exists() {
            if self.explicit {
                return Err(CistepError::ConfigNotFound(self.config_path.clone()));
            }
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> CistepResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CistepError::io(format!("reading config from {}", path.display()), e))?;

        debug!("Loaded config from {}", path.display());
        toml::from_str(&content).map_err(|e| CistepError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_default_when_missing() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::for_workspace(temp.path());

        let config = manager.load().await.unwrap();
        assert_eq!(config.general.work_dir, PathBuf::from(".cistep"));
    }

    #[tokio::test]
    async fn explicit_missing_path_fails() {
        let temp = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp.path().join("nope.toml"));

        let err = manager.load().await.unwrap_err();
        assert!(matches!(err, CistepError::ConfigNotFound(_)));
    }

    #[tokio::test]
    async fn load_workspace_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "[general]\nwork_dir = \".ci\"\n",
        )
        .unwrap();

        let config = ConfigManager::for_workspace(temp.path()).load().await.unwrap();
        assert_eq!(config.general.work_dir, PathBuf::from(".ci"));
    }

    #[tokio::test]
    async fn invalid_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[general\n").unwrap();

        let err = ConfigManager::for_workspace(temp.path())
            .load()
            .await
            .unwrap_err();
        match err {
            CistepError::ConfigInvalid { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected ConfigInvalid, got {:?}", other),
        }
    }

    #[test]
    #[serial_test::serial]
    fn cache_dir_under_runner_tool_cache() {
        let temp = TempDir::new().unwrap();
        std::env::set_var("RUNNER_TOOL_CACHE", temp.path());
        let dir = ConfigManager::default_cache_dir();
        std::env::remove_var("RUNNER_TOOL_CACHE");
        assert_eq!(dir, temp.path().join("cistep"));
    }
}
