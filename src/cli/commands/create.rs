use super::open_workspace;
use crate::cli::output::Output;
use crate::config::{get_repo_config_dir, Settings};
use crate::engine::StackEngine;
use crate::errors::{Result, RippleError};
use crate::store::NewStack;
use crate::utils::Spinner;
use dialoguer::Input;

/// Create a new stack with its initial blocks. Anything not supplied via
/// flags is prompted for, with defaults taken from the repo settings.
pub async fn run(
    name: Option<String>,
    target_bookmark: Option<String>,
    bookmark_prefix: Option<String>,
    commit_prefix: Option<String>,
    blocks: Vec<String>,
) -> Result<()> {
    let mut ws = open_workspace()?;
    let settings = Settings::load_or_default(&get_repo_config_dir(ws.vcs.repo_root()));

    let name = match name {
        Some(name) => name,
        None => prompt("Stack name", None)?,
    };
    let target_bookmark = match target_bookmark {
        Some(bookmark) => bookmark,
        None => prompt(
            "Target bookmark",
            Some(settings.stack.target_bookmark.clone()),
        )?,
    };
    let bookmark_prefix = match bookmark_prefix {
        Some(prefix) => prefix,
        None => prompt(
            "Bookmark prefix",
            Some(settings.stack.bookmark_prefix.clone()),
        )?,
    };
    let commit_prefix = match commit_prefix {
        Some(prefix) => prefix,
        None => prompt("Commit prefix", Some(settings.stack.commit_prefix.clone()))?,
    };

    let block_names = if blocks.is_empty() {
        prompt_block_names()?
    } else {
        blocks
    };
    if block_names.is_empty() {
        return Err(RippleError::config(
            "A stack needs at least one block. Pass --block or enter a name at the prompt.",
        ));
    }

    let spinner = Spinner::new(format!("Creating stack '{name}'..."));
    let mut engine = StackEngine::new(&mut ws.store, &ws.vcs);
    let result = engine.create_stack(
        NewStack {
            name,
            target_bookmark,
            bookmark_prefix,
            commit_prefix,
        },
        &block_names,
    );
    spinner.stop();

    let view = result?;
    let current = view.blocks.last().map(|b| b.change_id.clone());
    Output::stack_view(&view, current.as_deref());
    Ok(())
}

fn prompt(label: &str, default: Option<String>) -> Result<String> {
    let mut input = Input::<String>::new().with_prompt(label);
    if let Some(default) = default {
        input = input.default(default).show_default(true);
    }
    input
        .allow_empty(true)
        .interact_text()
        .map_err(|e| RippleError::config(format!("Prompt failed: {e}")))
}

/// Collect ordered block names until an empty line is entered.
fn prompt_block_names() -> Result<Vec<String>> {
    let mut names = Vec::new();
    loop {
        let label = if names.is_empty() {
            "First block name".to_string()
        } else {
            format!("Block {} name (empty to finish)", names.len())
        };
        let value: String = Input::new()
            .with_prompt(label)
            .allow_empty(true)
            .interact_text()
            .map_err(|e| RippleError::config(format!("Prompt failed: {e}")))?;
        let value = value.trim().to_string();
        if value.is_empty() {
            break;
        }
        names.push(value);
    }
    Ok(names)
}
