//! File system paths for persisted configuration and credentials.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Directory name under the home directory.
const BASE_DIR_NAME: &str = ".ecency";

/// Resolves where configuration, credentials and logs live on disk.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory (~/.ecency)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a new Paths instance rooted at `~/.ecency`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("home directory is not available".to_string()))?;

        Ok(Self {
            base_dir: home.join(BASE_DIR_NAME),
        })
    }

    /// Paths rooted at `base_dir` instead of the home directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.ecency).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.ecency/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the credential store file path (~/.ecency/credentials.json).
    pub fn credentials_file(&self) -> PathBuf {
        self.base_dir.join("credentials.json")
    }

    /// Get the logs directory (~/.ecency/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Create the base and log directories if missing.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
