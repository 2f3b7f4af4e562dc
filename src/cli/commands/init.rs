use crate::cli::output::Output;
use crate::config::{get_repo_config_dir, initialize_repo, is_repo_initialized};
use crate::errors::{Result, RippleError};
use crate::store::StackStore;
use crate::vcs::find_repository_root;
use std::env;

/// Initialize a repository for Ripple
pub async fn run(force: bool) -> Result<()> {
    tracing::info!("Initializing Ripple repository...");

    let current_dir = env::current_dir()
        .map_err(|e| RippleError::config(format!("Could not get current directory: {e}")))?;

    // Ripple sits on top of jj; nothing to do outside a jj repository
    let repo_root = find_repository_root(&current_dir).map_err(|_| {
        RippleError::not_initialized(
            "Not in a jj repository. Run this command from within a jj repository.",
        )
    })?;
    tracing::debug!("Found jj repository at: {}", repo_root.display());

    if is_repo_initialized(&repo_root) && !force {
        Output::info("Repository is already initialized for Ripple.");
        Output::tip("Use --force to rewrite the default configuration.");
        return Ok(());
    }

    initialize_repo(&repo_root)?;

    // Opening the store creates the database and applies migrations
    let config_dir = get_repo_config_dir(&repo_root);
    StackStore::open(&config_dir)?;

    Output::success("Ripple repository initialized");
    Output::sub_item(format!("State directory: {}", config_dir.display()));
    println!("\nNext steps:");
    println!("  1. Create your first stack:");
    println!("     ripple create \"my-feature\"");
    println!("  2. Inspect it:");
    println!("     ripple status");

    Ok(())
}
