use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use log::warn;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::models::Conversation;
use crate::error::{Error, Result};

fn db_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("io", "pitchlink", "Pitchlink")?;
    Some(proj.data_dir().join("cache.sqlite"))
}

// Caching the conversation list so the inbox renders before the network answers
pub struct Cache {
    conn: Connection,
}

impl Cache {
    pub fn open_default() -> Result<Self> {
        let path = db_path().ok_or_else(|| Error::Config("No data dir".into()))?;
        Self::open(&path)
    }

    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                last_activity TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                raw_json TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { conn })
    }

    pub fn upsert(&mut self, conversations: &[Conversation]) -> Result<()> {
        let now = Utc::now();
        let tx = self.conn.transaction()?;
        for c in conversations {
            let raw = serde_json::to_string(c)?;
            tx.execute(
                r#"
                INSERT INTO conversations (id, last_activity, updated_at, raw_json)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(id) DO UPDATE SET
                    last_activity=excluded.last_activity,
                    updated_at=excluded.updated_at,
                    raw_json=excluded.raw_json
                "#,
                params![c.id, c.last_activity(), now, raw],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Cached conversations, most recent activity first. Rows that no longer
    /// decode are skipped.
    pub fn conversations(&self, limit: Option<usize>) -> Result<Vec<Conversation>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, raw_json FROM conversations ORDER BY last_activity DESC, id ASC LIMIT ?1")?;
        let lim = limit.unwrap_or(500) as i64;
        let rows = stmt.query_map(params![lim], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        let mut out = Vec::new();
        for r in rows {
            let (id, raw) = r?;
            match serde_json::from_str::<Conversation>(&raw) {
                Ok(c) => out.push(c),
                Err(e) => warn!("Skipping cached conversation {}: {}", id, e),
            }
        }
        Ok(out)
    }

    pub fn updated_at(&self, id: &str) -> Result<Option<DateTime<Utc>>> {
        let mut stmt = self.conn.prepare("SELECT updated_at FROM conversations WHERE id = ?1")?;
        let ts = stmt.query_row(params![id], |row| row.get(0)).optional()?;
        Ok(ts)
    }
}
