use super::open_workspace;
use crate::cli::output::Output;
use crate::engine::StackEngine;
use crate::errors::Result;

/// Show the current stack's blocks with lifecycle markers
pub async fn run() -> Result<()> {
    let mut ws = open_workspace()?;
    let engine = StackEngine::new(&mut ws.store, &ws.vcs);
    let ctx = engine.current_context()?;

    Output::stack_header(&ctx.stack);
    Output::divider();
    for block in &ctx.blocks {
        Output::block_line(block, Some(&ctx.current_change_id));
    }

    Ok(())
}
