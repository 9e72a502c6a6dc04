use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::store::{Entity, EntityStore, Predicate};

/// SQLite-backed [`EntityStore`].
///
/// Each record is one JSON document keyed by `(kind, id)`. Writes open a
/// transaction on first use and stay pending until [`EntityStore::save`];
/// anything unsaved is rolled back when the connection closes.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS entities (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    kind TEXT NOT NULL,
                    id TEXT NOT NULL,
                    body TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE(kind, id)
                );

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "CREATE INDEX IF NOT EXISTS idx_entities_kind_seq ON entities(kind, seq);
                 PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    fn begin_if_needed(&self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.conn
                .execute_batch("BEGIN")
                .context("Failed to start transaction")?;
        }
        Ok(())
    }
}

impl EntityStore for Database {
    fn fetch<E: Entity>(&self, predicate: Option<Predicate<'_, E>>) -> Result<Vec<E>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, body FROM entities WHERE kind = ?1 ORDER BY seq")?;
        let rows = stmt.query_map(params![E::KIND.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, body) = row?;
            let entity: E = serde_json::from_str(&body)
                .with_context(|| format!("Corrupt {} record {id}", E::KIND))?;
            if predicate.is_none_or(|p| p(&entity)) {
                out.push(entity);
            }
        }
        Ok(out)
    }

    fn fetch_count<E: Entity>(&self, predicate: Option<Predicate<'_, E>>) -> Result<usize> {
        if predicate.is_some() {
            return Ok(self.fetch(predicate)?.len());
        }
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entities WHERE kind = ?1",
            params![E::KIND.as_str()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn fetch_by_id<E: Entity>(&self, id: Uuid) -> Result<Option<E>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM entities WHERE kind = ?1 AND id = ?2",
                params![E::KIND.as_str(), id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| {
            serde_json::from_str(&b).with_context(|| format!("Corrupt {} record {id}", E::KIND))
        })
        .transpose()
    }

    fn insert<E: Entity>(&mut self, entity: &E) -> Result<()> {
        let body = serde_json::to_string(entity)
            .with_context(|| format!("Failed to encode {} record", E::KIND))?;
        let now = Local::now().to_rfc3339();
        self.begin_if_needed()?;
        self.conn.execute(
            "INSERT INTO entities (kind, id, body, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(kind, id) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at",
            params![E::KIND.as_str(), entity.id().to_string(), body, now],
        )?;
        Ok(())
    }

    fn delete<E: Entity>(&mut self, id: Uuid) -> Result<bool> {
        self.begin_if_needed()?;
        let affected = self.conn.execute(
            "DELETE FROM entities WHERE kind = ?1 AND id = ?2",
            params![E::KIND.as_str(), id.to_string()],
        )?;
        Ok(affected > 0)
    }

    fn save(&mut self) -> Result<()> {
        if !self.conn.is_autocommit() {
            self.conn
                .execute_batch("COMMIT")
                .context("Failed to commit changes")?;
        }
        Ok(())
    }
}
