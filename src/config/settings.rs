use crate::errors::{Result, RippleError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

/// Repo-local settings stored at `.ripple/config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub stack: StackDefaults,
}

/// Defaults offered by the create wizard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackDefaults {
    /// Upstream bookmark new base-level blocks are created against
    pub target_bookmark: String,
    /// Suggested bookmark name prefix for new stacks
    pub bookmark_prefix: String,
    /// Suggested description prefix for new stacks
    pub commit_prefix: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stack: StackDefaults::default(),
        }
    }
}

impl Default for StackDefaults {
    fn default() -> Self {
        Self {
            target_bookmark: "main".to_string(),
            bookmark_prefix: String::new(),
            commit_prefix: String::new(),
        }
    }
}

impl Settings {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| RippleError::config(format!("Failed to read settings: {e}")))?;
        let settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .map_err(|e| RippleError::config(format!("Failed to write settings: {e}")))?;
        Ok(())
    }

    /// Load the repo's settings, falling back to defaults when the file is
    /// missing (e.g. pre-init repositories). An unreadable file also falls
    /// back, with a warning so the operator knows their defaults were ignored.
    pub fn load_or_default(config_dir: &Path) -> Self {
        let path = config_dir.join("config.json");
        if !path.is_file() {
            return Self::default();
        }
        match Self::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("ignoring settings at {}: {e}", path.display());
                Self::default()
            }
        }
    }
}
