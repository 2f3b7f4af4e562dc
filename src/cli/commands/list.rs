use super::open_workspace;
use crate::cli::output::Output;
use crate::errors::Result;
use crate::vcs::VcsGateway;

/// List all stacks with their done/total progress
pub async fn run() -> Result<()> {
    let ws = open_workspace()?;

    let stacks = ws.store.find_all_stacks()?;
    if stacks.is_empty() {
        Output::info("No stacks in this repository yet.");
        Output::tip("Use 'ripple create' to start a stack.");
        return Ok(());
    }

    // Mark the stack owning the working-copy change, if any. An untracked
    // working copy is fine here; the list still renders.
    let current_stack_id = ws
        .vcs
        .current_change_id()
        .ok()
        .and_then(|change_id| ws.store.find_stack_by_change_id(&change_id).ok().flatten())
        .map(|stack| stack.id);

    let stats = ws.store.all_stack_stats()?;
    for stack in &stacks {
        let stack_stats = stats
            .iter()
            .find(|s| s.stack_id == stack.id)
            .cloned()
            .unwrap_or_else(|| crate::store::StackStats {
                stack_id: stack.id,
                total: 0,
                done: 0,
                first_open_change_id: None,
            });
        Output::stack_list_line(stack, &stack_stats, current_stack_id == Some(stack.id));
    }
    Output::tip("Use 'ripple switch <name>' to resume a stack.");

    Ok(())
}
