//! Shared SQLite connection handle.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{ErrorCode, ScdError, ScdResult};

/// Cloneable handle over one SQLite connection.
///
/// Every store built from the same handle sees the same database. The lock is
/// taken for a single operation (or one batch chunk) and released after.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> ScdResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| ScdError::Storage {
            message: format!("failed to open database at {}: {}", path.display(), e),
            code: ErrorCode::DbConnectionFailed,
            source: Some(Box::new(e)),
        })?;
        debug!(path = %path.display(), "Opened database");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Private in-memory database (for testing).
    pub fn in_memory() -> ScdResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Open according to `config`; no path means in-memory.
    pub fn from_config(config: &StoreConfig) -> ScdResult<Self> {
        config.validate()?;
        let db = match &config.db_path {
            Some(path) => Self::open(path)?,
            None => Self::in_memory()?,
        };
        db.with_conn(|conn| {
            conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
            Ok(())
        })?;
        Ok(db)
    }

    /// Backing file, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Run `f` while holding the connection lock.
    pub(crate) fn with_conn<R>(
        &self,
        f: impl FnOnce(&mut Connection) -> ScdResult<R>,
    ) -> ScdResult<R> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| ScdError::lock_poisoned(format!("connection lock poisoned: {}", e)))?;
        f(&mut conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}
