//! Durable storage for stacks and blocks
//!
//! A thin repository over a repo-local SQLite file (`.ripple/ripple.sqlite`).
//! Owns the query and mutation primitives the engine composes, including the
//! reindexing that keeps block positions contiguous and bookmark names
//! derived from them. Compound writes (create-stack, insert, delete) run in
//! a single transaction.

pub mod migrations;

use crate::errors::{Result, RippleError};
use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "ripple.sqlite";

/// An ordered, named group of dependent changes. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    pub id: i64,
    pub name: String,
    /// Upstream bookmark base-level blocks are created against
    pub target_bookmark: String,
    /// Prefix from which each block's bookmark name is derived (`prefix + position`)
    pub bookmark_prefix: String,
    /// Prefix prepended to every block's description
    pub commit_prefix: String,
}

/// One workflow-tracked change within a stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub id: i64,
    pub stack_id: i64,
    /// Zero-based index within the stack; contiguous per stack at rest
    pub position: i64,
    pub name: String,
    /// Id of the live jj change backing this block; unique across all blocks
    pub change_id: String,
    /// Always `bookmark_prefix + position`; recomputed whenever position changes
    pub bookmark_name: String,
    pub is_submitted: bool,
    pub is_done: bool,
    pub updated_at: String,
}

/// Fields for a stack row about to be created.
#[derive(Debug, Clone)]
pub struct NewStack {
    pub name: String,
    pub target_bookmark: String,
    pub bookmark_prefix: String,
    pub commit_prefix: String,
}

/// Fields for a block row about to be created.
#[derive(Debug, Clone)]
pub struct NewBlock {
    pub position: i64,
    pub name: String,
    pub change_id: String,
    pub bookmark_name: String,
    pub is_submitted: bool,
    pub is_done: bool,
}

/// Partial update of a block row. Unset fields are left untouched;
/// position and bookmark_name are only ever rewritten by reindexing.
#[derive(Debug, Clone, Default)]
pub struct BlockUpdate {
    pub name: Option<String>,
    pub change_id: Option<String>,
    pub is_submitted: Option<bool>,
    pub is_done: Option<bool>,
    pub updated_at: Option<String>,
}

/// Per-stack progress summary for the list view.
#[derive(Debug, Clone)]
pub struct StackStats {
    pub stack_id: i64,
    pub total: i64,
    pub done: i64,
    /// Change id of the lowest-index block not yet done, if any
    pub first_open_change_id: Option<String>,
}

/// Repository over the embedded SQLite database.
pub struct StackStore {
    conn: Connection,
}

impl StackStore {
    /// Open (creating if needed) the store inside the given config directory
    /// and bring the schema up to date.
    pub fn open(config_dir: &Path) -> Result<Self> {
        let mut conn = Connection::open(config_dir.join(DB_FILE_NAME))?;
        migrations::run(&mut conn)?;
        Ok(Self { conn })
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrations::run(&mut conn)?;
        Ok(Self { conn })
    }

    /// Locate the stack owning the block whose current change id matches.
    /// Absence is a normal outcome, not an error.
    pub fn find_stack_by_change_id(&self, change_id: &str) -> Result<Option<Stack>> {
        self.conn
            .query_row(
                "SELECT s.id, s.name, s.target_bookmark, s.bookmark_prefix, s.commit_prefix
                 FROM stack s
                 INNER JOIN block b ON b.stack_id = s.id
                 WHERE b.change_id = ?1",
                params![change_id],
                row_to_stack,
            )
            .optional()
            .map_err(RippleError::from)
    }

    pub fn find_stack(&self, stack_id: i64) -> Result<Option<Stack>> {
        self.conn
            .query_row(
                "SELECT id, name, target_bookmark, bookmark_prefix, commit_prefix
                 FROM stack WHERE id = ?1",
                params![stack_id],
                row_to_stack,
            )
            .optional()
            .map_err(RippleError::from)
    }

    /// Look a stack up by its name; the oldest wins if names collide.
    pub fn find_stack_by_name(&self, name: &str) -> Result<Option<Stack>> {
        self.conn
            .query_row(
                "SELECT id, name, target_bookmark, bookmark_prefix, commit_prefix
                 FROM stack WHERE name = ?1 ORDER BY id ASC LIMIT 1",
                params![name],
                row_to_stack,
            )
            .optional()
            .map_err(RippleError::from)
    }

    /// All stacks, oldest first.
    pub fn find_all_stacks(&self) -> Result<Vec<Stack>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, target_bookmark, bookmark_prefix, commit_prefix
             FROM stack ORDER BY id ASC",
        )?;
        let stacks = stmt
            .query_map([], row_to_stack)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stacks)
    }

    pub fn find_block_by_change_id(&self, change_id: &str) -> Result<Option<Block>> {
        self.conn
            .query_row(
                &format!("{BLOCK_SELECT} WHERE change_id = ?1"),
                params![change_id],
                row_to_block,
            )
            .optional()
            .map_err(RippleError::from)
    }

    /// The canonical index-ordered view of a stack, straight from disk.
    pub fn list_blocks(&self, stack_id: i64) -> Result<Vec<Block>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{BLOCK_SELECT} WHERE stack_id = ?1 ORDER BY position ASC"))?;
        let blocks = stmt
            .query_map(params![stack_id], row_to_block)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(blocks)
    }

    /// Insert a block at `block.position`, shifting every block at or past
    /// that position up by one (and recomputing its bookmark name) first.
    /// The position must fall inside `0..=count` so the stack stays gapless.
    /// The shift and the insert commit as one transaction.
    pub fn insert_block_at(&mut self, block: NewBlock, stack_id: i64) -> Result<Block> {
        let stack = self
            .find_stack(stack_id)?
            .ok_or_else(|| RippleError::not_found(format!("stack {stack_id}")))?;
        self.check_contiguous(stack_id)?;

        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM block WHERE stack_id = ?1",
            params![stack_id],
            |row| row.get(0),
        )?;
        if block.position < 0 || block.position > count {
            return Err(RippleError::invariant(format!(
                "inserting at index {} would leave a gap (stack {stack_id} has {count} blocks)",
                block.position
            )));
        }

        let tx = self.conn.transaction()?;
        let id = {
            let mut stmt = tx.prepare(
                "SELECT id, position FROM block
                 WHERE stack_id = ?1 AND position >= ?2
                 ORDER BY position DESC",
            )?;
            let shifted = stmt
                .query_map(params![stack_id, block.position], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<(i64, i64)>>>()?;

            for (id, position) in shifted {
                let new_position = position + 1;
                tx.execute(
                    "UPDATE block SET position = ?1, bookmark_name = ?2 WHERE id = ?3",
                    params![
                        new_position,
                        format!("{}{}", stack.bookmark_prefix, new_position),
                        id
                    ],
                )?;
            }

            tx.execute(
                "INSERT INTO block (stack_id, position, name, change_id, bookmark_name, is_submitted, is_done)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    stack_id,
                    block.position,
                    block.name,
                    block.change_id,
                    block.bookmark_name,
                    block.is_submitted,
                    block.is_done
                ],
            )?;
            tx.last_insert_rowid()
        };
        tx.commit()?;

        self.get_block(id)
    }

    /// Delete the given block and decrement the position (and recomputed
    /// bookmark name) of every later block in the same stack, closing the gap.
    pub fn delete_block(&mut self, block: &Block) -> Result<()> {
        let stack = self
            .find_stack(block.stack_id)?
            .ok_or_else(|| RippleError::not_found(format!("stack {}", block.stack_id)))?;
        self.check_contiguous(block.stack_id)?;

        let tx = self.conn.transaction()?;
        {
            tx.execute("DELETE FROM block WHERE id = ?1", params![block.id])?;

            let mut stmt = tx.prepare(
                "SELECT id, position FROM block
                 WHERE stack_id = ?1 AND position > ?2
                 ORDER BY position ASC",
            )?;
            let shifted = stmt
                .query_map(params![block.stack_id, block.position], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
                })?
                .collect::<rusqlite::Result<Vec<(i64, i64)>>>()?;

            for (id, position) in shifted {
                let new_position = position - 1;
                tx.execute(
                    "UPDATE block SET position = ?1, bookmark_name = ?2 WHERE id = ?3",
                    params![
                        new_position,
                        format!("{}{}", stack.bookmark_prefix, new_position),
                        id
                    ],
                )?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    /// Persist a partial update. Position and bookmark name are deliberately
    /// not expressible here; reindexing owns those columns.
    pub fn update_block(&self, id: i64, update: BlockUpdate) -> Result<()> {
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(name) = update.name {
            sets.push("name = ?");
            values.push(name.into());
        }
        if let Some(change_id) = update.change_id {
            sets.push("change_id = ?");
            values.push(change_id.into());
        }
        if let Some(is_submitted) = update.is_submitted {
            sets.push("is_submitted = ?");
            values.push(is_submitted.into());
        }
        if let Some(is_done) = update.is_done {
            sets.push("is_done = ?");
            values.push(is_done.into());
        }
        if let Some(updated_at) = update.updated_at {
            sets.push("updated_at = ?");
            values.push(updated_at.into());
        }

        if sets.is_empty() {
            return Ok(());
        }

        values.push(id.into());
        let sql = format!("UPDATE block SET {} WHERE id = ?", sets.join(", "));
        let changed = self.conn.execute(&sql, params_from_iter(values))?;
        if changed == 0 {
            return Err(RippleError::not_found(format!("block {id}")));
        }
        Ok(())
    }

    /// Insert the stack and its initial blocks as one atomic unit.
    pub fn create_stack(&mut self, stack: NewStack, blocks: Vec<NewBlock>) -> Result<Stack> {
        let tx = self.conn.transaction()?;
        let stack_id = {
            tx.execute(
                "INSERT INTO stack (name, target_bookmark, bookmark_prefix, commit_prefix)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    stack.name,
                    stack.target_bookmark,
                    stack.bookmark_prefix,
                    stack.commit_prefix
                ],
            )?;
            let stack_id = tx.last_insert_rowid();

            for block in &blocks {
                tx.execute(
                    "INSERT INTO block (stack_id, position, name, change_id, bookmark_name, is_submitted, is_done)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        stack_id,
                        block.position,
                        block.name,
                        block.change_id,
                        block.bookmark_name,
                        block.is_submitted,
                        block.is_done
                    ],
                )?;
            }
            stack_id
        };
        tx.commit()?;

        Ok(Stack {
            id: stack_id,
            name: stack.name,
            target_bookmark: stack.target_bookmark,
            bookmark_prefix: stack.bookmark_prefix,
            commit_prefix: stack.commit_prefix,
        })
    }

    pub fn stack_stats(&self, stack_id: i64) -> Result<StackStats> {
        let (total, done) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_done), 0) FROM block WHERE stack_id = ?1",
            params![stack_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
        )?;

        let first_open_change_id = self
            .conn
            .query_row(
                "SELECT change_id FROM block
                 WHERE stack_id = ?1 AND is_done = 0
                 ORDER BY position ASC LIMIT 1",
                params![stack_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(StackStats {
            stack_id,
            total,
            done,
            first_open_change_id,
        })
    }

    pub fn all_stack_stats(&self) -> Result<Vec<StackStats>> {
        let stacks = self.find_all_stacks()?;
        stacks.iter().map(|s| self.stack_stats(s.id)).collect()
    }

    fn get_block(&self, id: i64) -> Result<Block> {
        self.conn
            .query_row(
                &format!("{BLOCK_SELECT} WHERE id = ?1"),
                params![id],
                row_to_block,
            )
            .optional()?
            .ok_or_else(|| RippleError::not_found(format!("block {id}")))
    }

    /// Defensive check run before reindexing: the position set of a stack
    /// must be exactly 0..N-1. A violation aborts the operation.
    fn check_contiguous(&self, stack_id: i64) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("SELECT position FROM block WHERE stack_id = ?1 ORDER BY position ASC")?;
        let positions = stmt
            .query_map(params![stack_id], |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;

        for (expected, actual) in positions.iter().enumerate() {
            if *actual != expected as i64 {
                return Err(RippleError::invariant(format!(
                    "stack {stack_id} has block index {actual} where {expected} was expected"
                )));
            }
        }
        Ok(())
    }
}

const BLOCK_SELECT: &str = "SELECT id, stack_id, position, name, change_id, bookmark_name, \
     is_submitted, is_done, updated_at FROM block";

fn row_to_stack(row: &rusqlite::Row<'_>) -> rusqlite::Result<Stack> {
    Ok(Stack {
        id: row.get(0)?,
        name: row.get(1)?,
        target_bookmark: row.get(2)?,
        bookmark_prefix: row.get(3)?,
        commit_prefix: row.get(4)?,
    })
}

fn row_to_block(row: &rusqlite::Row<'_>) -> rusqlite::Result<Block> {
    Ok(Block {
        id: row.get(0)?,
        stack_id: row.get(1)?,
        position: row.get(2)?,
        name: row.get(3)?,
        change_id: row.get(4)?,
        bookmark_name: row.get(5)?,
        is_submitted: row.get(6)?,
        is_done: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_block(position: i64, name: &str, change_id: &str) -> NewBlock {
        NewBlock {
            position,
            name: name.to_string(),
            change_id: change_id.to_string(),
            bookmark_name: format!("pfx-{position}"),
            is_submitted: false,
            is_done: false,
        }
    }

    fn seed_stack(store: &mut StackStore) -> Stack {
        store
            .create_stack(
                NewStack {
                    name: "feature".to_string(),
                    target_bookmark: "main".to_string(),
                    bookmark_prefix: "pfx-".to_string(),
                    commit_prefix: "[feature] ".to_string(),
                },
                vec![
                    new_block(0, "a", "change-a"),
                    new_block(1, "b", "change-b"),
                    new_block(2, "c", "change-c"),
                ],
            )
            .unwrap()
    }

    fn positions(store: &StackStore, stack_id: i64) -> Vec<(i64, String, String)> {
        store
            .list_blocks(stack_id)
            .unwrap()
            .into_iter()
            .map(|b| (b.position, b.name, b.bookmark_name))
            .collect()
    }

    #[test]
    fn test_create_stack_and_list() {
        let mut store = StackStore::open_in_memory().unwrap();
        let stack = seed_stack(&mut store);

        let blocks = store.list_blocks(stack.id).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].name, "a");
        assert_eq!(blocks[2].bookmark_name, "pfx-2");
        assert!(blocks.iter().all(|b| !b.is_submitted && !b.is_done));
    }

    #[test]
    fn test_find_stack_by_change_id() {
        let mut store = StackStore::open_in_memory().unwrap();
        let stack = seed_stack(&mut store);

        let found = store.find_stack_by_change_id("change-b").unwrap();
        assert_eq!(found.map(|s| s.id), Some(stack.id));
        assert!(store.find_stack_by_change_id("nope").unwrap().is_none());
    }

    #[test]
    fn test_insert_shifts_later_blocks() {
        let mut store = StackStore::open_in_memory().unwrap();
        let stack = seed_stack(&mut store);

        let inserted = store
            .insert_block_at(new_block(1, "between", "change-x"), stack.id)
            .unwrap();
        assert_eq!(inserted.position, 1);

        assert_eq!(
            positions(&store, stack.id),
            vec![
                (0, "a".to_string(), "pfx-0".to_string()),
                (1, "between".to_string(), "pfx-1".to_string()),
                (2, "b".to_string(), "pfx-2".to_string()),
                (3, "c".to_string(), "pfx-3".to_string()),
            ]
        );
    }

    #[test]
    fn test_insert_past_end_leaves_no_gap() {
        let mut store = StackStore::open_in_memory().unwrap();
        let stack = seed_stack(&mut store);
        let before = positions(&store, stack.id);

        let err = store
            .insert_block_at(new_block(5, "beyond", "change-x"), stack.id)
            .unwrap_err();
        assert!(matches!(err, RippleError::InvariantViolation(_)));
        assert_eq!(positions(&store, stack.id), before);
    }

    #[test]
    fn test_insert_at_negative_index_rejected() {
        let mut store = StackStore::open_in_memory().unwrap();
        let stack = seed_stack(&mut store);

        let err = store
            .insert_block_at(new_block(-1, "below", "change-x"), stack.id)
            .unwrap_err();
        assert!(matches!(err, RippleError::InvariantViolation(_)));
    }

    #[test]
    fn test_find_stack_by_name() {
        let mut store = StackStore::open_in_memory().unwrap();
        let stack = seed_stack(&mut store);

        let found = store.find_stack_by_name("feature").unwrap();
        assert_eq!(found.map(|s| s.id), Some(stack.id));
        assert!(store.find_stack_by_name("nope").unwrap().is_none());
    }

    #[test]
    fn test_delete_closes_gap_and_recomputes_bookmarks() {
        let mut store = StackStore::open_in_memory().unwrap();
        let stack = seed_stack(&mut store);

        let blocks = store.list_blocks(stack.id).unwrap();
        store.delete_block(&blocks[1]).unwrap();

        assert_eq!(
            positions(&store, stack.id),
            vec![
                (0, "a".to_string(), "pfx-0".to_string()),
                (1, "c".to_string(), "pfx-1".to_string()),
            ]
        );
    }

    #[test]
    fn test_insert_then_delete_round_trips() {
        let mut store = StackStore::open_in_memory().unwrap();
        let stack = seed_stack(&mut store);
        let before = positions(&store, stack.id);

        let inserted = store
            .insert_block_at(new_block(1, "temp", "change-t"), stack.id)
            .unwrap();
        store.delete_block(&inserted).unwrap();

        assert_eq!(positions(&store, stack.id), before);
    }

    #[test]
    fn test_append_at_end_shifts_nothing() {
        let mut store = StackStore::open_in_memory().unwrap();
        let stack = seed_stack(&mut store);

        store
            .insert_block_at(new_block(3, "tail", "change-d"), stack.id)
            .unwrap();

        let blocks = store.list_blocks(stack.id).unwrap();
        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[3].name, "tail");
        assert_eq!(blocks[0].bookmark_name, "pfx-0");
    }

    #[test]
    fn test_update_block_is_partial() {
        let mut store = StackStore::open_in_memory().unwrap();
        let stack = seed_stack(&mut store);
        let block = store.list_blocks(stack.id).unwrap().remove(1);

        store
            .update_block(
                block.id,
                BlockUpdate {
                    is_submitted: Some(true),
                    updated_at: Some("2026-01-01T00:00:00Z".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let updated = store.list_blocks(stack.id).unwrap().remove(1);
        assert!(updated.is_submitted);
        assert_eq!(updated.updated_at, "2026-01-01T00:00:00Z");
        // untouched fields survive
        assert_eq!(updated.name, "b");
        assert_eq!(updated.position, 1);
        assert_eq!(updated.bookmark_name, "pfx-1");
        assert!(!updated.is_done);
    }

    #[test]
    fn test_update_block_replaces_change_id() {
        let mut store = StackStore::open_in_memory().unwrap();
        let stack = seed_stack(&mut store);
        let block = store.list_blocks(stack.id).unwrap().remove(0);

        store
            .update_block(
                block.id,
                BlockUpdate {
                    change_id: Some("change-a2".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(store.find_stack_by_change_id("change-a").unwrap().is_none());
        assert!(store.find_stack_by_change_id("change-a2").unwrap().is_some());
    }

    #[test]
    fn test_update_missing_block_is_not_found() {
        let store = StackStore::open_in_memory().unwrap();
        let err = store
            .update_block(
                999,
                BlockUpdate {
                    is_done: Some(true),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, RippleError::NotFound(_)));
    }

    #[test]
    fn test_create_stack_is_atomic_on_constraint_violation() {
        let mut store = StackStore::open_in_memory().unwrap();

        // duplicate change id trips the unique index on the second insert
        let result = store.create_stack(
            NewStack {
                name: "broken".to_string(),
                target_bookmark: "main".to_string(),
                bookmark_prefix: "p-".to_string(),
                commit_prefix: String::new(),
            },
            vec![new_block(0, "a", "dup"), new_block(1, "b", "dup")],
        );

        assert!(matches!(result, Err(RippleError::Storage(_))));
        assert!(store.find_all_stacks().unwrap().is_empty());
        assert!(store.find_stack_by_change_id("dup").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_change_id_across_stacks_rejected() {
        let mut store = StackStore::open_in_memory().unwrap();
        seed_stack(&mut store);

        let result = store.create_stack(
            NewStack {
                name: "other".to_string(),
                target_bookmark: "main".to_string(),
                bookmark_prefix: "o-".to_string(),
                commit_prefix: String::new(),
            },
            vec![new_block(0, "clash", "change-a")],
        );
        assert!(matches!(result, Err(RippleError::Storage(_))));
    }

    #[test]
    fn test_reindex_aborts_on_corrupted_positions() {
        let mut store = StackStore::open_in_memory().unwrap();
        let stack = seed_stack(&mut store);

        // corrupt a position behind the store's back
        store
            .conn
            .execute(
                "UPDATE block SET position = 5 WHERE change_id = 'change-b'",
                [],
            )
            .unwrap();

        let err = store
            .insert_block_at(new_block(1, "x", "change-x"), stack.id)
            .unwrap_err();
        assert!(matches!(err, RippleError::InvariantViolation(_)));
    }

    #[test]
    fn test_stack_stats() {
        let mut store = StackStore::open_in_memory().unwrap();
        let stack = seed_stack(&mut store);
        let blocks = store.list_blocks(stack.id).unwrap();

        store
            .update_block(
                blocks[0].id,
                BlockUpdate {
                    is_done: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        let stats = store.stack_stats(stack.id).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.done, 1);
        assert_eq!(stats.first_open_change_id, Some("change-b".to_string()));
    }

    #[test]
    fn test_stack_stats_all_done() {
        let mut store = StackStore::open_in_memory().unwrap();
        let stack = seed_stack(&mut store);
        for block in store.list_blocks(stack.id).unwrap() {
            store
                .update_block(
                    block.id,
                    BlockUpdate {
                        is_done: Some(true),
                        ..Default::default()
                    },
                )
                .unwrap();
        }

        let stats = store.stack_stats(stack.id).unwrap();
        assert_eq!(stats.done, 3);
        assert!(stats.first_open_change_id.is_none());
    }
}
