pub mod block;
pub mod create;
pub mod init;
pub mod list;
pub mod status;
pub mod switch;

use crate::config;
use crate::errors::{Result, RippleError};
use crate::store::StackStore;
use crate::vcs::{self, JjVcs};
use std::env;

/// Shared handles for commands that operate on an initialized repository.
pub struct Workspace {
    pub store: StackStore,
    pub vcs: JjVcs,
}

/// Locate the enclosing jj repository, require Ripple to be initialized in
/// it, and open the store and gateway.
pub fn open_workspace() -> Result<Workspace> {
    let current_dir = env::current_dir()
        .map_err(|e| RippleError::config(format!("Could not get current directory: {e}")))?;
    let repo_root = vcs::find_repository_root(&current_dir)?;

    if !config::is_repo_initialized(&repo_root) {
        return Err(RippleError::not_initialized(
            "Repository is not initialized for Ripple. Run 'ripple init' first.",
        ));
    }

    let config_dir = config::get_repo_config_dir(&repo_root);
    let store = StackStore::open(&config_dir)?;
    let vcs = JjVcs::new(repo_root);

    Ok(Workspace { store, vcs })
}
