//! Database handle and transaction helper

use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use thiserror::Error;

use super::schema;
use crate::config::DatabaseConfig;

/// Storage error types
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid value in column '{column}': {value}")]
    InvalidValue { column: &'static str, value: String },

    #[error("Schema migration failed: {0}")]
    Migration(String),

    #[error("Rollback failed: {rollback} (original error: {original})")]
    Rollback {
        rollback: rusqlite::Error,
        original: String,
    },
}

/// SQLite database shared by the ledger, the plugin store and the local gatekeepers
///
/// One connection is kept behind a mutex, so transactions from concurrent
/// requests are serialized and every re-read inside a transaction observes the
/// latest committed state.
pub struct Database {
    conn: Mutex<Connection>,
    path: String,
}

impl Database {
    /// Open (or create) the database described by the config and apply pending migrations
    pub fn open(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let path = config.path.to_string_lossy().to_string();
        if path != ":memory:" {
            if let Some(parent) = config.path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        tracing::info!("Opening plugin database at {}", path);
        let conn = Connection::open(Path::new(&path))?;
        Self::from_connection(conn, path, config.busy_timeout)
    }

    /// Open a migrated in-memory database
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, ":memory:".to_string(), Duration::from_secs(5))
    }

    fn from_connection(
        conn: Connection,
        path: String,
        busy_timeout: Duration,
    ) -> Result<Self, StorageError> {
        conn.busy_timeout(busy_timeout)?;
        // WAL is unavailable for in-memory databases; ignore pragma failures.
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        let _ = conn.pragma_update(None, "synchronous", "NORMAL");
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let db = Self {
            conn: Mutex::new(conn),
            path,
        };
        let applied = db.migrate()?;
        if applied > 0 {
            tracing::debug!("Applied {} schema migrations to {}", applied, db.path);
        }
        Ok(db)
    }

    /// Database path (`:memory:` for in-memory databases)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Apply pending schema migrations, returning how many ran
    pub fn migrate(&self) -> Result<usize, StorageError> {
        let mut conn = self.conn.lock();
        schema::migrate(&mut conn)
    }

    /// Current schema version
    pub fn schema_version(&self) -> Result<u32, StorageError> {
        let conn = self.conn.lock();
        schema::current_version(&conn)
    }

    /// Run a closure inside an immediate write transaction.
    ///
    /// Commits when the closure returns `Ok`, rolls back on `Err`. A failed
    /// rollback is reported together with the original error.
    pub fn transaction<T, E>(&self, f: impl FnOnce(&Transaction<'_>) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StorageError> + Display,
    {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;

        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(StorageError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = tx.rollback() {
                    return Err(E::from(StorageError::Rollback {
                        rollback,
                        original: err.to_string(),
                    }));
                }
                Err(err)
            }
        }
    }

    /// Run a read-only closure against the connection without opening a transaction
    pub fn read<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}
