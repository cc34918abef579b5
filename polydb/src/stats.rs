//! Play statistics and favorite flags of local tracks
//!
//! Remote servers keep their own statistics; only local audio needs this
//! table. Rows are keyed by the audio identifier string.

use crate::{Database, Result};
use chrono::{DateTime, TimeZone, Utc};
use polysource::Identifier;
use rusqlite::{OptionalExtension, Row, params};
use tracing::debug;

/// Statistics row for one local audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalStats {
    pub identifier: Identifier,
    pub play_count: u32,
    pub last_played: Option<DateTime<Utc>>,
    pub favorite: bool,
}

const COLUMNS: &str = "identifier, play_count, last_played, favorite";

/// Access to the `local_stats` table
#[derive(Debug, Clone)]
pub struct StatsStore {
    db: Database,
}

impl StatsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Increments the play count and stamps `last_played`
    pub fn record_played(&self, id: &Identifier, at: DateTime<Utc>) -> Result<()> {
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO local_stats (identifier, play_count, last_played, favorite)
             VALUES (?1, 1, ?2, 0)
             ON CONFLICT(identifier) DO UPDATE SET
                 play_count = play_count + 1,
                 last_played = excluded.last_played",
            params![id.as_str(), at.timestamp_millis()],
        )?;
        debug!(id=%id, "Recorded play");
        Ok(())
    }

    pub fn set_favorite(&self, id: &Identifier, favorite: bool) -> Result<()> {
        let conn = self.db.lock();
        conn.execute(
            "INSERT INTO local_stats (identifier, play_count, last_played, favorite)
             VALUES (?1, 0, NULL, ?2)
             ON CONFLICT(identifier) DO UPDATE SET favorite = excluded.favorite",
            params![id.as_str(), favorite as i64],
        )?;
        Ok(())
    }

    pub fn get(&self, id: &Identifier) -> Result<Option<LocalStats>> {
        let conn = self.db.lock();
        let stats = conn
            .query_row(
                &format!("SELECT {} FROM local_stats WHERE identifier = ?1", COLUMNS),
                params![id.as_str()],
                read_row,
            )
            .optional()?;
        Ok(stats)
    }

    pub fn all(&self) -> Result<Vec<LocalStats>> {
        self.select(&format!(
            "SELECT {} FROM local_stats ORDER BY identifier",
            COLUMNS
        ))
    }

    pub fn favorites(&self) -> Result<Vec<LocalStats>> {
        self.select(&format!(
            "SELECT {} FROM local_stats WHERE favorite != 0 ORDER BY identifier",
            COLUMNS
        ))
    }

    /// Most played first; never-played rows are excluded
    pub fn most_played(&self, limit: usize) -> Result<Vec<LocalStats>> {
        self.select(&format!(
            "SELECT {} FROM local_stats WHERE play_count > 0
             ORDER BY play_count DESC, last_played DESC LIMIT {}",
            COLUMNS, limit
        ))
    }

    /// Most recent first
    pub fn recently_played(&self, limit: usize) -> Result<Vec<LocalStats>> {
        self.select(&format!(
            "SELECT {} FROM local_stats WHERE last_played IS NOT NULL
             ORDER BY last_played DESC LIMIT {}",
            COLUMNS, limit
        ))
    }

    /// Deletes the given rows in one transaction; returns how many existed
    pub fn delete(&self, ids: &[Identifier]) -> Result<usize> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        let mut removed = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM local_stats WHERE identifier = ?1")?;
            for id in ids {
                removed += stmt.execute(params![id.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    fn select(&self, sql: &str) -> Result<Vec<LocalStats>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map([], read_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<LocalStats> {
    let identifier: String = row.get(0)?;
    let play_count: i64 = row.get(1)?;
    let last_played: Option<i64> = row.get(2)?;
    let favorite: i64 = row.get(3)?;

    Ok(LocalStats {
        identifier: Identifier::new(identifier),
        play_count: play_count.max(0) as u32,
        last_played: last_played.and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        favorite: favorite != 0,
    })
}
