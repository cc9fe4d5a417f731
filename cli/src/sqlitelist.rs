//! SQLite-backed implementation of `ListStore`
//!
//! Stores every list element as one row `(list_key, pos, data)`. Positions
//! are kept dense (0..len) by shifting rows inside a transaction whenever an
//! element is inserted or removed, so the store behaves like a remote list
//! server would.

use parking_lot::Mutex;
use remcoll::{ConnectionGate, ListStore, StoreError};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

/// SQLite-backed list storage
///
/// One connection guarded by a mutex; the lock is never held across an
/// await point.
pub struct SqliteListStore {
    conn: Mutex<Connection>,
}

fn command_error(err: rusqlite::Error) -> StoreError {
    StoreError::Command(err.to_string())
}

/// SQLite integers are signed; positions past `i64::MAX` clamp to it
fn to_pos(position: usize) -> i64 {
    i64::try_from(position).unwrap_or(i64::MAX)
}

fn from_pos(pos: i64) -> usize {
    usize::try_from(pos).unwrap_or(0)
}

impl SqliteListStore {
    /// Open (or create) the database at the given path
    ///
    /// # Errors
    ///
    /// Returns error if database cannot be opened or table creation fails.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, rusqlite::Error> {
        Self::with_connection(Connection::open(db_path)?)
    }

    /// Private in-memory database, mostly for tests
    ///
    /// # Errors
    ///
    /// Returns error if table creation fails.
    pub fn in_memory() -> Result<Self, rusqlite::Error> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, rusqlite::Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS list_items (
                list_key TEXT NOT NULL,
                pos INTEGER NOT NULL,
                data BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS list_items_key_pos ON list_items (list_key, pos);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Gate that opens the database at `db_path` on first use
    #[must_use]
    pub fn gate(db_path: impl Into<PathBuf>) -> ConnectionGate<Self> {
        let db_path = db_path.into();
        ConnectionGate::new(move || {
            let db_path = db_path.clone();
            async move { Self::open(&db_path).map_err(|e| StoreError::Connect(e.to_string())) }
        })
    }

    fn count(conn: &Connection, key: &str) -> Result<usize, rusqlite::Error> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM list_items WHERE list_key = ?1",
            params![key],
            |row| row.get(0),
        )?;
        Ok(from_pos(count))
    }

    fn insert_at(
        &self,
        key: &str,
        marker: &[u8],
        value: &[u8],
    ) -> Result<Option<usize>, rusqlite::Error> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let found: Option<i64> = tx
            .query_row(
                "SELECT MIN(pos) FROM list_items WHERE list_key = ?1 AND data = ?2",
                params![key, marker],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        let Some(pos) = found else {
            return Ok(None);
        };
        tx.execute(
            "UPDATE list_items SET pos = pos + 1 WHERE list_key = ?1 AND pos >= ?2",
            params![key, pos],
        )?;
        tx.execute(
            "INSERT INTO list_items (list_key, pos, data) VALUES (?1, ?2, ?3)",
            params![key, pos, value],
        )?;
        let count = Self::count(&tx, key)?;
        tx.commit()?;
        Ok(Some(count))
    }

    fn remove_matching(
        &self,
        key: &str,
        value: &[u8],
        count: usize,
    ) -> Result<usize, rusqlite::Error> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        // LIMIT -1 means no limit
        let limit = if count == 0 { -1 } else { to_pos(count) };
        let positions = {
            let mut stmt = tx.prepare(
                "SELECT pos FROM list_items WHERE list_key = ?1 AND data = ?2
                 ORDER BY pos LIMIT ?3",
            )?;
            let rows = stmt.query_map(params![key, value, limit], |row| row.get::<_, i64>(0))?;
            let positions = rows.collect::<Result<Vec<_>, _>>()?;
            positions
        };
        // Back to front so earlier positions stay valid
        for pos in positions.iter().rev() {
            tx.execute(
                "DELETE FROM list_items WHERE list_key = ?1 AND pos = ?2",
                params![key, pos],
            )?;
            tx.execute(
                "UPDATE list_items SET pos = pos - 1 WHERE list_key = ?1 AND pos > ?2",
                params![key, pos],
            )?;
        }
        tx.commit()?;
        Ok(positions.len())
    }
}

impl ListStore for SqliteListStore {
    async fn length(&self, key: &str) -> Result<usize, StoreError> {
        let conn = self.conn.lock();
        Self::count(&conn, key).map_err(command_error)
    }

    async fn get_at(&self, key: &str, position: usize) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT data FROM list_items WHERE list_key = ?1 AND pos = ?2",
            params![key, to_pos(position)],
            |row| row.get::<_, Vec<u8>>(0),
        )
        .optional()
        .map_err(command_error)
    }

    async fn push_tail(&self, key: &str, value: &[u8]) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction().map_err(command_error)?;
        let count = Self::count(&tx, key).map_err(command_error)?;
        tx.execute(
            "INSERT INTO list_items (list_key, pos, data) VALUES (?1, ?2, ?3)",
            params![key, to_pos(count), value],
        )
        .map_err(command_error)?;
        tx.commit().map_err(command_error)?;
        Ok(count + 1)
    }

    async fn insert_before(
        &self,
        key: &str,
        marker: &[u8],
        value: &[u8],
    ) -> Result<Option<usize>, StoreError> {
        self.insert_at(key, marker, value).map_err(command_error)
    }

    async fn remove_by_value(
        &self,
        key: &str,
        value: &[u8],
        count: usize,
    ) -> Result<usize, StoreError> {
        self.remove_matching(key, value, count).map_err(command_error)
    }

    async fn set_at(&self, key: &str, position: usize, value: &[u8]) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE list_items SET data = ?3 WHERE list_key = ?1 AND pos = ?2",
                params![key, to_pos(position), value],
            )
            .map_err(command_error)?;
        if changed == 0 {
            return Err(StoreError::Command(format!(
                "index out of range: {position}"
            )));
        }
        Ok(())
    }

    async fn range(
        &self,
        key: &str,
        start: usize,
        stop: usize,
    ) -> Result<Vec<Vec<u8>>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare(
                "SELECT data FROM list_items WHERE list_key = ?1 AND pos BETWEEN ?2 AND ?3
                 ORDER BY pos",
            )
            .map_err(command_error)?;
        let rows = stmt
            .query_map(params![key, to_pos(start), to_pos(stop)], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .map_err(command_error)?;
        let payloads = rows.collect::<Result<Vec<_>, _>>().map_err(command_error)?;
        Ok(payloads)
    }

    async fn delete_key(&self, key: &str) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let deleted = conn
            .execute("DELETE FROM list_items WHERE list_key = ?1", params![key])
            .map_err(command_error)?;
        Ok(deleted > 0)
    }
}
