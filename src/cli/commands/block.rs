//! Block lifecycle commands operating on the current stack.
//!
//! Each command resolves the current stack from jj's working-copy change,
//! picks the target block (explicit `--index` wins, otherwise the current
//! block), runs the engine operation under a spinner, and renders the
//! returned view.

use super::open_workspace;
use crate::cli::output::Output;
use crate::engine::{CurrentContext, RemoveOutcome, StackEngine};
use crate::errors::{Result, RippleError};
use crate::store::Block;
use crate::utils::Spinner;
use crate::vcs::VcsGateway;

pub async fn add(name: String, index: Option<i64>) -> Result<()> {
    let mut ws = open_workspace()?;
    let mut engine = StackEngine::new(&mut ws.store, &ws.vcs);
    let ctx = engine.current_context()?;
    let position = index.unwrap_or(ctx.blocks.len() as i64);

    let spinner = Spinner::new(format!("Adding '{name}' at index {position}..."));
    let result = engine.add_block(&ctx.stack, position, &name);
    spinner.stop();

    render(result?, &ws.vcs)
}

pub async fn describe(name: String, index: Option<i64>) -> Result<()> {
    let mut ws = open_workspace()?;
    let mut engine = StackEngine::new(&mut ws.store, &ws.vcs);
    let ctx = engine.current_context()?;
    let block = resolve_block(&ctx, index)?;

    let spinner = Spinner::new(format!("Describing '{}'...", block.name));
    let result = engine.describe_block(&ctx.stack, &block, &name);
    spinner.stop();

    render(result?, &ws.vcs)
}

pub async fn edit(index: i64) -> Result<()> {
    let mut ws = open_workspace()?;
    let mut engine = StackEngine::new(&mut ws.store, &ws.vcs);
    let ctx = engine.current_context()?;
    let block = resolve_block(&ctx, Some(index))?;

    let result = engine.edit_block(&ctx.stack, &block);
    render(result?, &ws.vcs)
}

pub async fn submit(index: Option<i64>) -> Result<()> {
    let mut ws = open_workspace()?;
    let mut engine = StackEngine::new(&mut ws.store, &ws.vcs);
    let ctx = engine.current_context()?;
    let block = resolve_block(&ctx, index)?;

    let spinner = Spinner::new(format!("Submitting '{}' to the remote...", block.name));
    let result = engine.submit_block(&ctx.stack, &block);
    spinner.stop();

    render(result?, &ws.vcs)
}

pub async fn merge(index: Option<i64>) -> Result<()> {
    let mut ws = open_workspace()?;
    let mut engine = StackEngine::new(&mut ws.store, &ws.vcs);
    let ctx = engine.current_context()?;
    let block = resolve_block(&ctx, index)?;

    let spinner = Spinner::new(format!("Merging '{}'...", block.name));
    let result = engine.merge_block(&ctx.stack, &block);
    spinner.stop();

    render(result?, &ws.vcs)
}

pub async fn sync() -> Result<()> {
    let mut ws = open_workspace()?;
    let mut engine = StackEngine::new(&mut ws.store, &ws.vcs);
    let ctx = engine.current_context()?;

    let spinner = Spinner::new("Syncing stack with upstream...".to_string());
    let result = engine.sync_stack(&ctx.stack);
    spinner.stop();

    render(result?, &ws.vcs)
}

pub async fn remove(index: Option<i64>) -> Result<()> {
    let mut ws = open_workspace()?;
    let mut engine = StackEngine::new(&mut ws.store, &ws.vcs);
    let ctx = engine.current_context()?;
    let block = resolve_block(&ctx, index)?;

    let spinner = Spinner::new(format!("Removing '{}'...", block.name));
    let result = engine.remove_block(&ctx.stack, &block);
    spinner.stop();

    match result? {
        RemoveOutcome::Advanced(view) => render(view, &ws.vcs),
        RemoveOutcome::StackExhausted { stack, removed } => {
            Output::success(format!("Removed '{}'", removed.name));
            Output::warning(format!(
                "No open block left to work on in stack '{}'.",
                stack.name
            ));
            Output::tip("Add a block with 'ripple add', or start another stack with 'ripple create'.");
            Ok(())
        }
    }
}

/// Explicit `--index` wins; otherwise the block backing the working copy.
fn resolve_block(ctx: &CurrentContext, index: Option<i64>) -> Result<Block> {
    let position = match index {
        Some(position) => position,
        None => ctx.current_position.ok_or_else(|| {
            RippleError::not_found(
                "The working copy is not on a tracked block; pass --index to pick one.",
            )
        })?,
    };

    ctx.blocks
        .iter()
        .find(|b| b.position == position)
        .cloned()
        .ok_or_else(|| RippleError::not_found(format!("no block at index {position}")))
}

fn render(view: crate::engine::StackView, vcs: &impl VcsGateway) -> Result<()> {
    // Re-derive the current pointer after the operation; merge/remove/edit
    // may have moved it.
    let current = vcs.current_change_id().ok();
    Output::stack_view(&view, current.as_deref());
    Ok(())
}
