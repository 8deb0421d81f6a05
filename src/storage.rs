use crate::api::models::Contact;
use crate::error::{Error, Result};
use directories::ProjectDirs;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn default_db_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("com", "example", "ChatSphere")?;
    Some(proj.data_dir().join("local.sqlite"))
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Key/value table playing the part of browser local storage, plus a contacts
/// cache so the sidebar can render before the backend answers.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn open_default() -> Result<Self> {
        let path = default_db_path().ok_or_else(|| Error::Config("no data dir".into()))?;
        Self::open(path)
    }

    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let storage = Self { path: path.into() };
        ensure_dir(&storage.path)?;
        storage.init()?;
        Ok(storage)
    }

    fn conn(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    fn init(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS contacts (
                owner_id TEXT NOT NULL,
                id TEXT NOT NULL,
                username TEXT NOT NULL,
                avatar_image TEXT NOT NULL,
                position INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (owner_id, id)
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get_item(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let value = conn
            .query_row("SELECT value FROM local_storage WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO local_storage (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value=excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    pub fn remove_item(&self, key: &str) -> Result<()> {
        self.conn()?.execute("DELETE FROM local_storage WHERE key = ?1", params![key])?;
        Ok(())
    }

    /// Drops every key and the contacts cache.
    pub fn clear(&self) -> Result<()> {
        self.conn()?.execute_batch("DELETE FROM local_storage; DELETE FROM contacts;")?;
        Ok(())
    }

    /// Replaces the cached contact list of `owner_id`, keeping backend order.
    pub fn replace_contacts(&self, owner_id: &str, contacts: &[Contact]) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Config(e.to_string()))?
            .as_secs() as i64;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM contacts WHERE owner_id = ?1", params![owner_id])?;
        for (idx, c) in contacts.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO contacts (owner_id, id, username, avatar_image, position, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(owner_id, id) DO UPDATE SET
                    username=excluded.username,
                    avatar_image=excluded.avatar_image,
                    position=excluded.position,
                    updated_at=excluded.updated_at
                "#,
                params![owner_id, c.id, c.username, c.avatar_image, idx as i64, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn cached_contacts(&self, owner_id: &str) -> Result<Vec<Contact>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, username, avatar_image FROM contacts WHERE owner_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![owner_id], |row| {
            Ok(Contact { id: row.get(0)?, username: row.get(1)?, avatar_image: row.get(2)? })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}
