//! Database schema and migrations

use crate::{DbError, DbPool, Result};

const SCHEMA_VERSION: i32 = 1;

/// Run database migrations
pub fn migrate(pool: &DbPool) -> Result<()> {
    let conn = pool.get().map_err(|e| DbError::Pool(e.to_string()))?;

    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if current_version > SCHEMA_VERSION {
        return Err(DbError::Migration(format!(
            "state was written by a newer drivesh (schema {}, expected {})",
            current_version, SCHEMA_VERSION
        )));
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            "Migrating state database from version {} to {}",
            current_version,
            SCHEMA_VERSION
        );

        if current_version < 1 {
            apply_v1(&conn)?;
        }

        conn.execute_batch(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))?;
    }

    Ok(())
}

fn apply_v1(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Loose session flags (active_drive, setup_done)
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Drive registry; provider is nullable so damaged rows still load
        CREATE TABLE IF NOT EXISTS drives (
            name TEXT PRIMARY KEY,
            provider TEXT,
            path TEXT NOT NULL DEFAULT '/',
            auth TEXT NOT NULL DEFAULT 'null',
            position INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        -- Named clips captured with `| cp`
        CREATE TABLE IF NOT EXISTS clips (
            name TEXT PRIMARY KEY,
            origin_drive TEXT NOT NULL,
            origin_path TEXT NOT NULL,
            files TEXT NOT NULL,  -- JSON array of entries
            captured_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        -- Prompt history, oldest first
        CREATE TABLE IF NOT EXISTS history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            command TEXT NOT NULL
        );
        "#,
    )?;

    Ok(())
}
