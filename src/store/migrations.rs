//! Schema migrations for the embedded store.
//!
//! Migrations are gated on SQLite's `user_version` pragma and applied in
//! order, each inside its own transaction. Every store open runs them, so
//! upgrading the binary upgrades the database on first use.

use crate::errors::Result;
use rusqlite::Connection;

const MIGRATIONS: &[&str] = &[
    // v1: initial schema
    r#"
    CREATE TABLE IF NOT EXISTS stack (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      name TEXT NOT NULL,
      target_bookmark TEXT NOT NULL,
      bookmark_prefix TEXT NOT NULL,
      commit_prefix TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS block (
      id INTEGER PRIMARY KEY AUTOINCREMENT,
      stack_id INTEGER NOT NULL REFERENCES stack(id),
      position INTEGER NOT NULL,
      name TEXT NOT NULL,
      change_id TEXT NOT NULL,
      bookmark_name TEXT NOT NULL,
      is_submitted INTEGER NOT NULL DEFAULT 0,
      is_done INTEGER NOT NULL DEFAULT 0,
      updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
    );

    CREATE UNIQUE INDEX IF NOT EXISTS block_change_id_idx ON block (change_id);
    CREATE INDEX IF NOT EXISTS block_stack_id_idx ON block (stack_id);
    "#,
];

/// Apply any migrations newer than the database's recorded version.
pub fn run(conn: &mut Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    for (idx, sql) in MIGRATIONS.iter().enumerate().skip(version as usize) {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", (idx + 1) as i64)?;
        tx.commit()?;
        tracing::debug!("applied store migration v{}", idx + 1);
    }

    Ok(())
}
