use super::open_workspace;
use crate::cli::output::Output;
use crate::engine::StackEngine;
use crate::errors::Result;
use crate::vcs::VcsGateway;

/// Switch to the named stack, resuming at its first open block
pub async fn run(name: String) -> Result<()> {
    let mut ws = open_workspace()?;
    let mut engine = StackEngine::new(&mut ws.store, &ws.vcs);
    let view = engine.switch_stack(&name)?;

    let current = ws.vcs.current_change_id().ok();
    Output::stack_view(&view, current.as_deref());
    Ok(())
}
