//! Route persistence.
//!
//! The store is a plain key-value boundary: one canonical JSON document per
//! route, keyed by id. `SqliteRouteStore` is the shipped implementation;
//! the trait exists so hosts with their own storage (a browser bridge, a
//! test double) can slot in.
//!
//! Every record passes through [`crate::normalize::normalize_record`] on
//! its way in, so only the canonical representation ever reaches disk.

use log::{info, warn};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, WaytraceError};
use crate::normalize;
use crate::route::RouteRecord;

/// Key-value persistence boundary for routes.
///
/// A route must not be assumed saved until `save` has returned `Ok`;
/// storage failures surface as explicit errors, never panics.
pub trait RouteStore {
    /// Insert or replace the record under its id.
    fn save(&mut self, record: &RouteRecord) -> Result<()>;
    /// Fetch one record, `None` when the id is unknown.
    fn load(&self, id: &str) -> Result<Option<RouteRecord>>;
    /// All records in creation order.
    fn list(&self) -> Result<Vec<RouteRecord>>;
    /// Remove a record; returns whether it existed.
    fn delete(&mut self, id: &str) -> Result<bool>;
}

/// SQLite-backed route store.
pub struct SqliteRouteStore {
    db: Connection,
}

impl SqliteRouteStore {
    /// Open (or create) a store at the given database path.
    pub fn open(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;
        info!("[RouteStore] Opened {}", db_path);
        Ok(Self { db })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS routes (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_routes_created_at ON routes(created_at);
            "#,
        )?;
        Ok(())
    }
}

impl RouteStore for SqliteRouteStore {
    fn save(&mut self, record: &RouteRecord) -> Result<()> {
        // Idempotent re-normalization; typed records pass through unchanged.
        let value = serde_json::to_value(record)?;
        let record = normalize::normalize_record(&value)
            .ok_or_else(|| WaytraceError::InvalidRecord("record has no usable id".to_string()))?;
        let data = serde_json::to_string(&record)?;

        self.db.execute(
            "INSERT OR REPLACE INTO routes (id, data, created_at) VALUES (?1, ?2, ?3)",
            params![record.id, data, record.created],
        )?;
        info!(
            "[RouteStore] Saved route {} ({} points)",
            record.id,
            record.points.len()
        );
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Option<RouteRecord>> {
        let data: Option<String> = self
            .db
            .query_row("SELECT data FROM routes WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;

        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<RouteRecord>> {
        let mut stmt = self
            .db
            .prepare("SELECT data FROM routes ORDER BY created_at, id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        // One unreadable row must not take the whole list down.
        let mut records = Vec::new();
        for row in rows {
            let json = row?;
            match serde_json::from_str::<RouteRecord>(&json) {
                Ok(record) => records.push(record),
                Err(e) => warn!("[RouteStore] Skipping unreadable record: {}", e),
            }
        }
        Ok(records)
    }

    fn delete(&mut self, id: &str) -> Result<bool> {
        let affected = self
            .db
            .execute("DELETE FROM routes WHERE id = ?1", params![id])?;
        if affected > 0 {
            info!("[RouteStore] Deleted route {}", id);
        }
        Ok(affected > 0)
    }
}
