use crate::api::models::Contact;
use chrono::Utc;
use directories::ProjectDirs;
use rusqlite::{params, Connection};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no data directory available")]
    NoDataDir,
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache db: {0}")]
    Db(#[from] rusqlite::Error),
}

/// Local copy of the contact directory, shown when the server is unreachable.
#[derive(Debug, Clone)]
pub struct ContactCache {
    path: PathBuf,
}

impl ContactCache {
    pub fn default_path() -> Option<PathBuf> {
        let proj = ProjectDirs::from("org", "clinic", "clinic-chat")?;
        Some(proj.data_dir().join("cache.sqlite"))
    }

    pub fn open_default() -> Result<Self, StorageError> {
        let path = Self::default_path().ok_or(StorageError::NoDataDir)?;
        Self::open(path)
    }

    /// Opens (creating if needed) the cache at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let cache = Self { path: path.into() };
        cache.init()?;
        Ok(cache)
    }

    fn conn(&self) -> Result<Connection, StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Connection::open(&self.path)?)
    }

    fn init(&self) -> Result<(), StorageError> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS contacts (
                id INTEGER PRIMARY KEY,
                position INTEGER NOT NULL,
                name TEXT NOT NULL,
                avatar_url TEXT,
                preview TEXT,
                unread INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Replaces the cached directory, keeping the server's order.
    pub fn store_contacts(&self, contacts: &[Contact]) -> Result<(), StorageError> {
        let now = Utc::now();
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM contacts", [])?;
        for (idx, c) in contacts.iter().enumerate() {
            tx.execute(
                r#"
                INSERT INTO contacts (id, position, name, avatar_url, preview, unread, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![c.id as i64, idx as i64, c.name, c.avatar_url, c.preview, c.unread, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn contacts(&self, limit: Option<usize>) -> Result<Vec<Contact>, StorageError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, avatar_url, preview, unread FROM contacts ORDER BY position ASC LIMIT ?1",
        )?;
        let lim = limit.unwrap_or(500) as i64;
        let rows = stmt.query_map(params![lim], |row| {
            Ok(Contact {
                id: row.get::<_, i64>(0)? as u64,
                name: row.get(1)?,
                avatar_url: row.get(2)?,
                preview: row.get(3)?,
                unread: row.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}
