//! Storage handle
//!
//! One SQLite connection shared by every component. All writes are
//! serialized through the mutex; the store is single-writer by design.

pub mod accounts;
pub mod ids;
pub mod queries;
pub mod schema;
pub mod sites;

use crate::error::AppError;
use crate::migrate::{self, MigrationSource};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Owned handle to the single-connection store
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if needed) the database file at `path`
    pub fn open(path: &Path) -> Result<Self, AppError> {
        info!("Opening store at {}", path.display());
        let conn = Connection::open(path)?;
        Self::configure(conn)
    }

    /// Private in-memory database, mostly for tests
    pub fn in_memory() -> Result<Self, AppError> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> Result<Self, AppError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn connection(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("store lock poisoned".into()))
    }

    /// Bring the schema up to date; see [`migrate::apply`]
    pub fn apply_migrations(&self, source: &dyn MigrationSource) -> Result<usize, AppError> {
        let mut conn = self.connection()?;
        migrate::apply(&mut conn, source)
    }

    /// Versions still to apply; see [`migrate::pending`]
    pub fn pending_migrations(&self, source: &dyn MigrationSource) -> Result<Vec<String>, AppError> {
        let conn = self.connection()?;
        migrate::pending(&conn, source)
    }
}
