//! SQLite-backed lock node and counter store.
//!
//! Enable with the `sqlite` feature flag:
//! ```toml
//! stocklock-core = { path = "../stocklock-core", features = ["sqlite"] }
//! ```
//!
//! Every lock primitive is a single SQL statement, so SQLite's own write
//! serialization makes each one atomic.

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{NodeError, StoreError};
use crate::infrastructure::{CounterStore, LockNode};
use crate::types::Counter;

fn open_connection(path: &str) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    // WAL lets readers proceed alongside the single writer
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    Ok(conn)
}

/// A lock node stored in one SQLite database.
pub struct SqliteLockNode {
    name: String,
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteLockNode {
    /// Open (or create) a lock node database at the given path.
    pub fn open(path: &str, clock: Arc<dyn Clock>) -> Result<Self, rusqlite::Error> {
        let conn = open_connection(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS lock_keys (
                resource   TEXT PRIMARY KEY,
                token      TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );",
        )?;

        Ok(Self {
            name: format!("sqlite:{}", path),
            conn: Mutex::new(conn),
            clock,
        })
    }
}

impl LockNode for SqliteLockNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn try_set(&self, resource: &str, token: &str, ttl_ms: u64) -> Result<bool, NodeError> {
        let now = self.clock.now_ms();
        let rows = self.conn.lock().execute(
            "INSERT INTO lock_keys (resource, token, expires_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(resource) DO UPDATE
                SET token = excluded.token, expires_at = excluded.expires_at
              WHERE lock_keys.expires_at <= ?4",
            params![resource, token, now + ttl_ms, now],
        )?;
        Ok(rows > 0)
    }

    fn try_delete(&self, resource: &str, token: &str) -> Result<bool, NodeError> {
        let now = self.clock.now_ms();
        let rows = self.conn.lock().execute(
            "DELETE FROM lock_keys WHERE resource = ?1 AND token = ?2 AND expires_at > ?3",
            params![resource, token, now],
        )?;
        Ok(rows > 0)
    }

    fn try_extend(&self, resource: &str, token: &str, ttl_ms: u64) -> Result<bool, NodeError> {
        let now = self.clock.now_ms();
        let rows = self.conn.lock().execute(
            "UPDATE lock_keys SET expires_at = ?3
              WHERE resource = ?1 AND token = ?2 AND expires_at > ?4",
            params![resource, token, now + ttl_ms, now],
        )?;
        Ok(rows > 0)
    }

    fn ping(&self) -> Result<(), NodeError> {
        self.conn
            .lock()
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

/// A persistent counter store backed by SQLite.
pub struct SqliteCounterStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteCounterStore {
    /// Open (or create) a product database at the given path.
    pub fn open(path: &str, clock: Arc<dyn Clock>) -> Result<Self, rusqlite::Error> {
        let conn = open_connection(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS products (
                id         INTEGER PRIMARY KEY,
                name       TEXT NOT NULL,
                stock      INTEGER NOT NULL DEFAULT 0 CHECK (stock >= 0),
                version    INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
            clock,
        })
    }

    fn row_to_counter(row: &rusqlite::Row) -> rusqlite::Result<Counter> {
        Ok(Counter {
            id: row.get(0)?,
            name: row.get(1)?,
            value: row.get(2)?,
            version: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn fetch(conn: &Connection, id: u64) -> Result<Option<Counter>, rusqlite::Error> {
        conn.query_row(
            "SELECT id, name, stock, version, created_at, updated_at FROM products WHERE id = ?1",
            params![id],
            Self::row_to_counter,
        )
        .optional()
    }
}

impl CounterStore for SqliteCounterStore {
    fn load(&self, id: u64) -> Result<Counter, StoreError> {
        let conn = self.conn.lock();
        Self::fetch(&conn, id)?.ok_or(StoreError::NotFound(id))
    }

    fn save(&self, counter: &Counter) -> Result<Counter, StoreError> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "UPDATE products
                SET name = ?1, stock = ?2, version = version + 1, updated_at = ?3
              WHERE id = ?4 AND version = ?5",
            params![
                counter.name,
                counter.value,
                self.clock.now_ms(),
                counter.id,
                counter.version,
            ],
        )?;

        if rows == 0 {
            return match Self::fetch(&conn, counter.id)? {
                Some(_) => Err(StoreError::StaleWrite {
                    id: counter.id,
                    expected: counter.version,
                }),
                None => Err(StoreError::NotFound(counter.id)),
            };
        }

        Self::fetch(&conn, counter.id)?.ok_or(StoreError::NotFound(counter.id))
    }

    fn insert(&self, counter: Counter) -> Result<Counter, StoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO products (name, stock, version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                counter.name,
                counter.value,
                counter.version,
                counter.created_at,
                counter.updated_at,
            ],
        )?;

        Ok(Counter {
            id: conn.last_insert_rowid() as u64,
            ..counter
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.conn.lock().execute("DELETE FROM products", [])?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<Counter>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, stock, version, created_at, updated_at FROM products ORDER BY id",
        )?;
        let counters = stmt
            .query_map([], Self::row_to_counter)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counters)
    }
}
