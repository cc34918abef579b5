//! # polydb - SQLite persistence for Polyphon
//!
//! One database file holds every table the core depends on:
//! - **servers**: remote server configuration records ([`ServerStore`])
//! - **resumption_items / resumption_state**: the last playback queue
//!   ([`QueueStore`])
//! - **local_stats**: play counts and favorite flags of local tracks
//!   ([`StatsStore`])
//!
//! The connection is shared behind a mutex; every store is a cheap handle
//! on the same [`Database`].
//!
//! # Example
//!
//! ```no_run
//! use polydb::{Database, QueueStore};
//!
//! # fn main() -> polydb::Result<()> {
//! let db = Database::open(std::path::Path::new("/tmp/polyphon.db"))?;
//! let queue = QueueStore::new(db.clone());
//! queue.update_position(2, 15_000)?;
//! # Ok(())
//! # }
//! ```

mod error;
mod queue;
mod servers;
mod stats;

pub use error::{DbError, Result};
pub use queue::{QueueStore, StoredQueue};
pub use servers::{NewServer, ServerRecord, ServerStore};
pub use stats::{LocalStats, StatsStore};

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS servers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        name TEXT NOT NULL,
        url TEXT NOT NULL,
        username TEXT NOT NULL,
        password TEXT NOT NULL,
        extra TEXT NOT NULL DEFAULT '{}'
    );

    CREATE TABLE IF NOT EXISTS resumption_items (
        position INTEGER PRIMARY KEY,
        identifier TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS resumption_state (
        id INTEGER PRIMARY KEY CHECK (id = 0),
        start_index INTEGER NOT NULL,
        start_position_ms INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS local_stats (
        identifier TEXT PRIMARY KEY,
        play_count INTEGER NOT NULL DEFAULT 0,
        last_played INTEGER,
        favorite INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_local_stats_last_played ON local_stats(last_played);
";

/// Shared SQLite connection with the Polyphon schema applied
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

impl Database {
    /// Opens (or creates) the database file and applies the schema
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbError::Persistence(format!("Failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| DbError::Persistence(format!("Failed to open database: {}", e)))?;
        info!(path=%db_path.display(), "Opened database");
        Self::init(conn)
    }

    /// Opens the database configured in `polyconfig`
    pub fn from_config(config: &polyconfig::Config) -> Result<Self> {
        let path = config
            .get_database_path()
            .map_err(|e| DbError::Persistence(format!("Failed to resolve database path: {}", e)))?;
        Self::open(&path)
    }

    /// Private in-memory database (tests, demos)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DbError::Persistence(format!("Failed to open database: {}", e)))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| DbError::Persistence(format!("Failed to create tables: {}", e)))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }
}
