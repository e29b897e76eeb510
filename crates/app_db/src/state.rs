//! Persisted shell state: drives, clips, session flags and history

use crate::{DbError, DbPool, Result};
use app_fs::{AuthState, FileEntry, RemotePath};
use rusqlite::{params, OptionalExtension};

const KEY_ACTIVE_DRIVE: &str = "active_drive";
const KEY_SETUP_DONE: &str = "setup_done";

/// Drive row as stored
#[derive(Debug, Clone, PartialEq)]
pub struct DriveRecord {
    pub name: String,
    /// `None` when the row is damaged
    pub provider: Option<String>,
    pub path: RemotePath,
    pub auth: AuthState,
}

/// Clip row as stored
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRecord {
    pub name: String,
    pub origin_drive: String,
    pub origin_path: RemotePath,
    pub files: Vec<FileEntry>,
}

/// State database operations
#[derive(Clone)]
pub struct StateDb {
    pool: DbPool,
}

impl StateDb {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager>> {
        self.pool.get().map_err(|e| DbError::Pool(e.to_string()))
    }

    // ===== Drives =====

    /// All drives in registration order
    pub fn load_drives(&self) -> Result<Vec<DriveRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, provider, path, auth FROM drives ORDER BY position, created_at, name",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut drives = Vec::new();
        for row in rows {
            let (name, provider, path, auth) = row?;
            let auth = match serde_json::from_str(&auth) {
                Ok(value) => AuthState::from_json(value),
                Err(e) => {
                    tracing::warn!("Drive {} has unreadable auth state: {}", name, e);
                    AuthState::empty()
                }
            };
            drives.push(DriveRecord {
                name,
                provider: provider.filter(|p| !p.is_empty()),
                path: RemotePath::new(&path),
                auth,
            });
        }

        Ok(drives)
    }

    /// Replace the whole drive table in one transaction
    pub fn save_drives(&self, drives: &[DriveRecord]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM drives", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO drives (name, provider, path, auth, position) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, drive) in drives.iter().enumerate() {
                let auth = serde_json::to_string(drive.auth.as_json())?;
                stmt.execute(params![
                    drive.name,
                    drive.provider,
                    drive.path.as_str(),
                    auth,
                    position as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ===== Session flags =====

    pub fn active_drive(&self) -> Result<Option<String>> {
        self.get_meta(KEY_ACTIVE_DRIVE)
    }

    pub fn set_active_drive(&self, name: &str) -> Result<()> {
        self.set_meta(KEY_ACTIVE_DRIVE, name)
    }

    pub fn setup_done(&self) -> Result<bool> {
        Ok(self.get_meta(KEY_SETUP_DONE)?.as_deref() == Some("true"))
    }

    pub fn mark_setup_done(&self) -> Result<()> {
        self.set_meta(KEY_SETUP_DONE, "true")
    }

    fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    // ===== Clips =====

    pub fn load_clips(&self) -> Result<Vec<ClipRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, origin_drive, origin_path, files FROM clips ORDER BY name",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut clips = Vec::new();
        for row in rows {
            let (name, origin_drive, origin_path, files) = row?;
            match serde_json::from_str(&files) {
                Ok(files) => clips.push(ClipRecord {
                    name,
                    origin_drive,
                    origin_path: RemotePath::new(&origin_path),
                    files,
                }),
                Err(e) => tracing::warn!("Dropping unreadable clip {}: {}", name, e),
            }
        }

        Ok(clips)
    }

    /// Insert or overwrite a clip
    pub fn save_clip(&self, clip: &ClipRecord) -> Result<()> {
        let conn = self.conn()?;
        let files = serde_json::to_string(&clip.files)?;
        conn.execute(
            r#"
            INSERT INTO clips (name, origin_drive, origin_path, files)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(name) DO UPDATE SET
                origin_drive = excluded.origin_drive,
                origin_path = excluded.origin_path,
                files = excluded.files,
                captured_at = strftime('%s', 'now')
            "#,
            params![clip.name, clip.origin_drive, clip.origin_path.as_str(), files],
        )?;
        Ok(())
    }

    // ===== History =====

    /// Stored prompt history, oldest first
    pub fn history(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT command FROM history ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;

        let mut commands = Vec::new();
        for row in rows {
            commands.push(row?);
        }
        Ok(commands)
    }

    /// Append a command and keep only the newest `limit` entries
    pub fn push_history(&self, command: &str, limit: usize) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("INSERT INTO history (command) VALUES (?1)", [command])?;
        conn.execute(
            "DELETE FROM history WHERE id NOT IN (SELECT id FROM history ORDER BY id DESC LIMIT ?1)",
            [limit as i64],
        )?;
        Ok(())
    }

    // ===== Reset =====

    /// Forget every drive, clip and flag; history survives
    pub fn reset(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM drives;
             DELETE FROM clips;
             DELETE FROM meta;",
        )?;
        tx.commit()?;
        tracing::warn!("Shell state was reset");
        Ok(())
    }
}
