//! Stack lifecycle engine
//!
//! Sequences jj gateway calls and store mutations for each workflow
//! operation so that, after any operation completes, stored state agrees
//! with the repository: every recorded change id is a live jj change, and
//! every recorded bookmark either exists remotely as pushed or has never
//! been pushed (`is_submitted = false`).
//!
//! Ordering rule used throughout: the jj mutation happens before the
//! corresponding store write, so a failed jj call never leaves stale
//! success state on disk. Store reindexing completes before any dependent
//! jj call that assumes the new layout.
//!
//! The engine is stateless between calls; everything it knows lives in the
//! store or is re-derived from jj. Which block is "current" is always
//! looked up fresh, never cached.

use crate::errors::{Result, RippleError};
use crate::store::{Block, BlockUpdate, NewBlock, NewStack, Stack, StackStore};
use crate::vcs::{NewChangeBase, VcsGateway};
use chrono::Utc;
use tracing::info;

/// Snapshot returned by every operation: the stack, its blocks re-listed
/// after the mutation, and a human-readable status line.
#[derive(Debug, Clone)]
pub struct StackView {
    pub stack: Stack,
    pub blocks: Vec<Block>,
    pub status: String,
}

/// Where the operator stands right now, derived from jj's working copy.
#[derive(Debug, Clone)]
pub struct CurrentContext {
    pub stack: Stack,
    pub blocks: Vec<Block>,
    pub current_change_id: String,
    /// Position of the block backing the working-copy change, if the
    /// working copy sits on a tracked block.
    pub current_position: Option<i64>,
}

/// Outcome of removing a block.
#[derive(Debug, Clone)]
pub enum RemoveOutcome {
    /// A neighboring block was made current.
    Advanced(StackView),
    /// No open block remains to resume editing; the caller decides what
    /// an exhausted stack means for its surface.
    StackExhausted { stack: Stack, removed: Block },
}

pub struct StackEngine<'a, V: VcsGateway> {
    store: &'a mut StackStore,
    vcs: &'a V,
}

impl<'a, V: VcsGateway> StackEngine<'a, V> {
    pub fn new(store: &'a mut StackStore, vcs: &'a V) -> Self {
        Self { store, vcs }
    }

    /// Map the working-copy change back to its stack. NotFound if the
    /// operator is parked on an untracked change.
    pub fn current_context(&self) -> Result<CurrentContext> {
        let current_change_id = self.vcs.current_change_id()?;
        let stack = self
            .store
            .find_stack_by_change_id(&current_change_id)?
            .ok_or_else(|| {
                RippleError::not_found(format!(
                    "change {current_change_id} is not part of any tracked stack"
                ))
            })?;
        let blocks = self.store.list_blocks(stack.id)?;
        let current_position = blocks
            .iter()
            .find(|b| b.change_id == current_change_id)
            .map(|b| b.position);

        Ok(CurrentContext {
            stack,
            blocks,
            current_change_id,
            current_position,
        })
    }

    /// Create a new block at `position`. The new change is based on the
    /// predecessor's change, or on the stack's target bookmark when there
    /// is no usable predecessor (first position, or predecessor already
    /// merged). Existing blocks are not rebased onto the newcomer; `sync`
    /// owns topology repair.
    pub fn add_block(&mut self, stack: &Stack, position: i64, name: &str) -> Result<StackView> {
        let blocks = self.store.list_blocks(stack.id)?;
        if position < 0 || position > blocks.len() as i64 {
            return Err(RippleError::not_found(format!(
                "no insertion point at index {position} (stack has {} blocks)",
                blocks.len()
            )));
        }

        let message = format!("{}{}", stack.commit_prefix, name);
        let predecessor = blocks.iter().find(|b| b.position == position - 1);
        match predecessor {
            Some(prev) if position != 0 && !prev.is_done => {
                self.vcs
                    .new_change(NewChangeBase::Change(&prev.change_id), &message)?;
            }
            _ => {
                self.vcs
                    .new_change(NewChangeBase::Target(&stack.target_bookmark), &message)?;
            }
        }

        let change_id = self.vcs.current_change_id()?;
        self.store.insert_block_at(
            NewBlock {
                position,
                name: name.to_string(),
                change_id,
                bookmark_name: format!("{}{}", stack.bookmark_prefix, position),
                is_submitted: false,
                is_done: false,
            },
            stack.id,
        )?;
        info!("added block '{}' at index {} in '{}'", name, position, stack.name);

        self.view(stack, format!("Added '{name}' at index {position}"))
    }

    /// Rewrite the block's jj description, then persist the new name.
    /// A failed describe leaves the store untouched.
    pub fn describe_block(
        &mut self,
        stack: &Stack,
        block: &Block,
        new_name: &str,
    ) -> Result<StackView> {
        self.vcs.describe(
            &block.change_id,
            &format!("{}{}", stack.commit_prefix, new_name),
        )?;
        self.store.update_block(
            block.id,
            BlockUpdate {
                name: Some(new_name.to_string()),
                updated_at: Some(now()),
                ..Default::default()
            },
        )?;

        self.view(stack, format!("'{new_name}' is the new description"))
    }

    /// Make the block's change current. Current-ness is derived state, so
    /// nothing is persisted.
    pub fn edit_block(&mut self, stack: &Stack, block: &Block) -> Result<StackView> {
        self.vcs.edit(&block.change_id)?;
        self.view(stack, format!("Now editing '{}'", block.name))
    }

    /// First submission creates the bookmark at the block's change and
    /// pushes it allowing new remote refs; resubmission pushes the existing
    /// bookmark only. A push failure leaves `is_submitted` as it was.
    pub fn submit_block(&mut self, stack: &Stack, block: &Block) -> Result<StackView> {
        if block.is_submitted {
            self.vcs.push_bookmark(&block.bookmark_name, false)?;
            return self.view(stack, format!("Updated '{}' on the remote", block.name));
        }

        self.vcs.create_bookmark(&block.bookmark_name, &block.change_id)?;
        self.vcs.push_bookmark(&block.bookmark_name, true)?;
        self.store.update_block(
            block.id,
            BlockUpdate {
                is_submitted: Some(true),
                updated_at: Some(now()),
                ..Default::default()
            },
        )?;
        info!("submitted '{}' as {}", block.name, block.bookmark_name);

        self.view(stack, format!("Submitted '{}' to the remote", block.name))
    }

    /// Delete the remote bookmark, mark the block done, fetch, and advance
    /// into the next block if one exists (rebased onto the target bookmark
    /// and made current). Deleting a bookmark that was never created fails
    /// in jj and aborts before the done-flag write.
    pub fn merge_block(&mut self, stack: &Stack, block: &Block) -> Result<StackView> {
        self.vcs.delete_bookmark(&block.bookmark_name)?;
        self.store.update_block(
            block.id,
            BlockUpdate {
                is_done: Some(true),
                updated_at: Some(now()),
                ..Default::default()
            },
        )?;
        self.vcs.fetch()?;

        let blocks = self.store.list_blocks(stack.id)?;
        let next = blocks.iter().find(|b| b.position == block.position + 1);
        let status = match next {
            Some(next) => {
                self.vcs.rebase(&next.change_id, &stack.target_bookmark)?;
                self.vcs.edit(&next.change_id)?;
                format!("Merged '{}'. Now editing '{}'", block.name, next.name)
            }
            None => format!("Merged '{}'", block.name),
        };
        info!("merged '{}' in '{}'", block.name, stack.name);

        self.view(stack, status)
    }

    /// Fetch upstream and rebase the first not-done block onto the target
    /// bookmark, repairing drift without touching local ordering.
    pub fn sync_stack(&mut self, stack: &Stack) -> Result<StackView> {
        self.vcs.fetch()?;

        let blocks = self.store.list_blocks(stack.id)?;
        let status = match blocks.iter().find(|b| !b.is_done) {
            Some(first_open) => {
                self.vcs
                    .rebase(&first_open.change_id, &stack.target_bookmark)?;
                format!(
                    "Rebased '{}' onto {}",
                    first_open.name, stack.target_bookmark
                )
            }
            None => "Nothing to sync: every block is done".to_string(),
        };

        self.view(stack, status)
    }

    /// Abandon the change, drop the row (reindexing later blocks), and
    /// resume editing at the block now occupying the removed index, falling
    /// back to the one before it. With no open block left the stack is
    /// exhausted and nothing is made current.
    pub fn remove_block(&mut self, stack: &Stack, block: &Block) -> Result<RemoveOutcome> {
        self.vcs.abandon(&block.change_id)?;
        self.store.delete_block(block)?;
        info!("removed block '{}' from '{}'", block.name, stack.name);

        let blocks = self.store.list_blocks(stack.id)?;
        let next = blocks
            .iter()
            .find(|b| b.position == block.position)
            .or_else(|| blocks.iter().find(|b| b.position == block.position - 1));

        match next {
            Some(next) if !next.is_done => {
                self.vcs.edit(&next.change_id)?;
                let status = format!("Removed '{}'. Now editing '{}'", block.name, next.name);
                Ok(RemoveOutcome::Advanced(StackView {
                    stack: stack.clone(),
                    blocks,
                    status,
                }))
            }
            _ => Ok(RemoveOutcome::StackExhausted {
                stack: stack.clone(),
                removed: block.clone(),
            }),
        }
    }

    /// Create a stack and its initial blocks: one jj change per name, the
    /// first based on the target bookmark and each next on the previous
    /// change, then one atomic store write, then check out the last block.
    pub fn create_stack(&mut self, meta: NewStack, block_names: &[String]) -> Result<StackView> {
        self.vcs.fetch()?;

        let mut new_blocks = Vec::with_capacity(block_names.len());
        let mut previous_change_id: Option<String> = None;
        for (position, name) in block_names.iter().enumerate() {
            let message = format!("{}{}", meta.commit_prefix, name);
            match &previous_change_id {
                None => self
                    .vcs
                    .new_change(NewChangeBase::Target(&meta.target_bookmark), &message)?,
                Some(prev) => self
                    .vcs
                    .new_change(NewChangeBase::Change(prev.as_str()), &message)?,
            }
            let change_id = self.vcs.current_change_id()?;
            new_blocks.push(NewBlock {
                position: position as i64,
                name: name.clone(),
                change_id: change_id.clone(),
                bookmark_name: format!("{}{}", meta.bookmark_prefix, position),
                is_submitted: false,
                is_done: false,
            });
            previous_change_id = Some(change_id);
        }

        let stack = self.store.create_stack(meta, new_blocks)?;
        if let Some(last) = previous_change_id {
            self.vcs.edit(&last)?;
        }
        info!(
            "created stack '{}' with {} blocks",
            stack.name,
            block_names.len()
        );

        let status = format!(
            "Created stack '{}' with {} blocks",
            stack.name,
            block_names.len()
        );
        self.view(&stack, status)
    }

    /// Resume work on the named stack by checking out its first not-done
    /// block. A fully merged stack has nothing to resume and is reported
    /// as NotFound before any jj call.
    pub fn switch_stack(&mut self, name: &str) -> Result<StackView> {
        let stack = self
            .store
            .find_stack_by_name(name)?
            .ok_or_else(|| RippleError::not_found(format!("no stack named '{name}'")))?;
        let stats = self.store.stack_stats(stack.id)?;
        let change_id = stats.first_open_change_id.ok_or_else(|| {
            RippleError::not_found(format!(
                "every block in '{}' is done; nothing to resume",
                stack.name
            ))
        })?;

        self.vcs.edit(&change_id)?;
        let block = self.store.find_block_by_change_id(&change_id)?.ok_or_else(|| {
            RippleError::invariant(format!("change {change_id} has no block row"))
        })?;
        info!("switched to '{}' at block '{}'", stack.name, block.name);

        self.view(
            &stack,
            format!("Switched to '{}'. Now editing '{}'", stack.name, block.name),
        )
    }

    fn view(&self, stack: &Stack, status: String) -> Result<StackView> {
        let blocks = self.store.list_blocks(stack.id)?;
        Ok(StackView {
            stack: stack.clone(),
            blocks,
            status,
        })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}
