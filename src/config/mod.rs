pub mod settings;

pub use settings::{Settings, StackDefaults};

use crate::errors::{Result, RippleError};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the Ripple configuration directory for a specific repository
pub fn get_repo_config_dir(repo_path: &Path) -> PathBuf {
    repo_path.join(".ripple")
}

/// Ensure the configuration directory exists
pub fn ensure_config_dir(config_dir: &Path) -> Result<()> {
    if !config_dir.exists() {
        fs::create_dir_all(config_dir).map_err(|e| {
            RippleError::config(format!("Failed to create config directory: {e}"))
        })?;
    }

    // Keep the state directory out of version control
    let gitignore = config_dir.join(".gitignore");
    if !gitignore.exists() {
        fs::write(&gitignore, "/*\n")
            .map_err(|e| RippleError::config(format!("Failed to write .gitignore: {e}")))?;
    }

    Ok(())
}

/// Check if a repository is initialized for Ripple
pub fn is_repo_initialized(repo_path: &Path) -> bool {
    let config_dir = get_repo_config_dir(repo_path);
    config_dir.exists() && config_dir.join("config.json").exists()
}

/// Initialize a repository for Ripple
pub fn initialize_repo(repo_path: &Path) -> Result<()> {
    let config_dir = get_repo_config_dir(repo_path);
    ensure_config_dir(&config_dir)?;

    let settings = Settings::default();
    settings.save_to_file(&config_dir.join("config.json"))?;

    tracing::info!("Initialized Ripple repository at {}", repo_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_repo_creates_layout() {
        let tmp = TempDir::new().unwrap();
        initialize_repo(tmp.path()).unwrap();

        let config_dir = get_repo_config_dir(tmp.path());
        assert!(config_dir.is_dir());
        assert!(config_dir.join("config.json").is_file());
        assert_eq!(
            fs::read_to_string(config_dir.join(".gitignore")).unwrap(),
            "/*\n"
        );
        assert!(is_repo_initialized(tmp.path()));
    }

    #[test]
    fn test_uninitialized_repo_is_detected() {
        let tmp = TempDir::new().unwrap();
        assert!(!is_repo_initialized(tmp.path()));
    }
}
