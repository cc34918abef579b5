//! Remote server configuration records
//!
//! Passwords are encrypted at rest with `polyconfig::encryption`. The store
//! publishes the full record list through a `watch` channel after every
//! change so the provider catalog can recompute.

use crate::{Database, DbError, Result};
use polyconfig::encryption;
use polysource::BackendKind;
use rusqlite::{params, OptionalExtension, Row};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// One configured remote server
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRecord {
    /// Row id; doubles as the provider instance id
    pub id: i64,
    pub kind: BackendKind,
    pub name: String,
    pub url: String,
    pub username: String,
    /// Plaintext password (decrypted on load)
    pub password: String,
    /// Kind-specific flags, e.g. `{"legacy_auth": true}`
    pub extra: Value,
}

impl ServerRecord {
    /// Reads a boolean flag from `extra`, `false` when absent
    pub fn flag(&self, name: &str) -> bool {
        self.extra.get(name).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Values for a record that has no id yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewServer {
    pub kind: BackendKind,
    pub name: String,
    pub url: String,
    pub username: String,
    pub password: String,
    pub extra: Value,
}

impl NewServer {
    pub fn new(
        kind: BackendKind,
        name: impl Into<String>,
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            url: url.into(),
            username: username.into(),
            password: password.into(),
            extra: Value::Object(Default::default()),
        }
    }

    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = extra;
        self
    }
}

/// CRUD access to the `servers` table with change notification
#[derive(Debug, Clone)]
pub struct ServerStore {
    db: Database,
    records: Arc<watch::Sender<Vec<ServerRecord>>>,
}

impl ServerStore {
    /// Creates the store and loads the current records
    pub fn new(db: Database) -> Result<Self> {
        let initial = Self::query_all(&db)?;
        let (tx, _) = watch::channel(initial);
        Ok(Self {
            db,
            records: Arc::new(tx),
        })
    }

    /// Live view of every record, ordered by id
    pub fn subscribe(&self) -> watch::Receiver<Vec<ServerRecord>> {
        self.records.subscribe()
    }

    pub fn list(&self) -> Vec<ServerRecord> {
        self.records.borrow().clone()
    }

    pub fn get(&self, id: i64) -> Result<ServerRecord> {
        let conn = self.db.lock();
        conn.query_row(
            "SELECT id, kind, name, url, username, password, extra FROM servers WHERE id = ?1",
            params![id],
            read_row,
        )
        .optional()?
        .ok_or_else(|| DbError::NotFound(format!("server {}", id)))?
    }

    /// Inserts a record and returns it with its id
    pub fn add(&self, server: NewServer) -> Result<ServerRecord> {
        validate_kind(server.kind)?;
        let id = {
            let conn = self.db.lock();
            conn.execute(
                "INSERT INTO servers (kind, name, url, username, password, extra)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    server.kind.as_str(),
                    server.name,
                    server.url,
                    server.username,
                    protect_password(&server.password),
                    server.extra.to_string(),
                ],
            )?;
            conn.last_insert_rowid()
        };
        info!(id, kind=%server.kind, name=%server.name, "Added server");
        self.publish()?;
        self.get(id)
    }

    /// Replaces every field of an existing record
    pub fn update(&self, record: &ServerRecord) -> Result<()> {
        validate_kind(record.kind)?;
        let changed = {
            let conn = self.db.lock();
            conn.execute(
                "UPDATE servers SET kind = ?2, name = ?3, url = ?4, username = ?5,
                        password = ?6, extra = ?7
                 WHERE id = ?1",
                params![
                    record.id,
                    record.kind.as_str(),
                    record.name,
                    record.url,
                    record.username,
                    protect_password(&record.password),
                    record.extra.to_string(),
                ],
            )?
        };
        if changed == 0 {
            return Err(DbError::NotFound(format!("server {}", record.id)));
        }
        self.publish()
    }

    /// Deletes a record; returns `false` if it did not exist
    pub fn remove(&self, id: i64) -> Result<bool> {
        let changed = {
            let conn = self.db.lock();
            conn.execute("DELETE FROM servers WHERE id = ?1", params![id])?
        };
        if changed > 0 {
            info!(id, "Removed server");
            self.publish()?;
        }
        Ok(changed > 0)
    }

    fn publish(&self) -> Result<()> {
        let records = Self::query_all(&self.db)?;
        self.records.send_replace(records);
        Ok(())
    }

    fn query_all(db: &Database) -> Result<Vec<ServerRecord>> {
        let conn = db.lock();
        let mut stmt = conn.prepare(
            "SELECT id, kind, name, url, username, password, extra FROM servers ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], read_row)?;

        let mut records = Vec::new();
        for row in rows {
            match row? {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping unreadable server record: {}", e),
            }
        }
        Ok(records)
    }
}

fn validate_kind(kind: BackendKind) -> Result<()> {
    if kind.is_remote() {
        Ok(())
    } else {
        Err(DbError::InvalidRecord(format!(
            "{} is not a remote server kind",
            kind
        )))
    }
}

fn protect_password(password: &str) -> String {
    match encryption::encrypt_password(password) {
        Ok(encrypted) => encrypted,
        Err(e) => {
            warn!("Storing server password unencrypted: {}", e);
            password.to_string()
        }
    }
}

/// Maps a row; the inner result carries record-level decoding failures
fn read_row(row: &Row<'_>) -> rusqlite::Result<Result<ServerRecord>> {
    let id: i64 = row.get(0)?;
    let kind: String = row.get(1)?;
    let stored_password: String = row.get(5)?;
    let extra: String = row.get(6)?;

    let record = (|| -> Result<ServerRecord> {
        let kind = kind
            .parse::<BackendKind>()
            .map_err(DbError::InvalidRecord)?;
        let password = encryption::get_password(&stored_password)
            .map_err(|e| DbError::InvalidRecord(format!("server {} password: {}", id, e)))?;
        let extra = serde_json::from_str(&extra)
            .map_err(|e| DbError::InvalidRecord(format!("server {} extra: {}", id, e)))?;
        Ok(ServerRecord {
            id,
            kind,
            name: row.get(2)?,
            url: row.get(3)?,
            username: row.get(4)?,
            password,
            extra,
        })
    })();
    Ok(record)
}
