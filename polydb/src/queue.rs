//! Resumption queue tables

use crate::{Database, DbError, Result};
use polysource::Identifier;
use rusqlite::{params, OptionalExtension};

/// Queue as stored: identifiers plus the play cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredQueue {
    pub identifiers: Vec<Identifier>,
    pub start_index: usize,
    pub start_position_ms: u64,
}

/// Converts a cursor value to an SQLite integer, refusing values that would wrap
fn sql_int<T>(value: T, what: &str) -> Result<i64>
where
    T: TryInto<i64> + Copy + std::fmt::Display,
{
    value
        .try_into()
        .map_err(|_| DbError::InvalidRecord(format!("{} out of range: {}", what, value)))
}

/// Access to the persisted playback queue
#[derive(Debug, Clone)]
pub struct QueueStore {
    db: Database,
}

impl QueueStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Replaces the stored queue wholesale
    ///
    /// Clear and insert run in one transaction: a concurrent reader sees
    /// either the old or the new queue, never a mix.
    pub fn replace(
        &self,
        identifiers: &[Identifier],
        start_index: usize,
        start_position_ms: u64,
    ) -> Result<()> {
        let start_index = sql_int(start_index, "start index")?;
        let start_position_ms = sql_int(start_position_ms, "start position")?;

        let mut conn = self.db.lock();
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM resumption_items", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO resumption_items (position, identifier) VALUES (?1, ?2)")?;
            for (position, id) in identifiers.iter().enumerate() {
                stmt.execute(params![position as i64, id.as_str()])?;
            }
        }
        tx.execute(
            "INSERT OR REPLACE INTO resumption_state (id, start_index, start_position_ms)
             VALUES (0, ?1, ?2)",
            params![start_index, start_position_ms],
        )?;

        tx.commit()
            .map_err(|e| DbError::Persistence(format!("Failed to save queue: {}", e)))
    }

    /// Updates the cursor without touching the identifiers
    pub fn update_position(&self, start_index: usize, start_position_ms: u64) -> Result<()> {
        let start_index = sql_int(start_index, "start index")?;
        let start_position_ms = sql_int(start_position_ms, "start position")?;

        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO resumption_state (id, start_index, start_position_ms)
             VALUES (0, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET
                 start_index = excluded.start_index,
                 start_position_ms = excluded.start_position_ms",
            params![start_index, start_position_ms],
        )?;
        Ok(())
    }

    /// Removes the stored queue and cursor
    pub fn clear(&self) -> Result<()> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM resumption_items", [])?;
        tx.execute("DELETE FROM resumption_state", [])?;
        tx.commit()?;
        Ok(())
    }

    /// Reads the stored queue; an empty queue if nothing was saved
    pub fn load(&self) -> Result<StoredQueue> {
        let conn = self.db.lock();

        let cursor: Option<(i64, i64)> = conn
            .query_row(
                "SELECT start_index, start_position_ms FROM resumption_state WHERE id = 0",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let mut stmt =
            conn.prepare("SELECT identifier FROM resumption_items ORDER BY position ASC")?;
        let identifiers = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|row| row.map(Identifier::new))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let (start_index, start_position_ms) = cursor.unwrap_or((0, 0));
        Ok(StoredQueue {
            identifiers,
            start_index: start_index.max(0) as usize,
            start_position_ms: start_position_ms.max(0) as u64,
        })
    }
}
