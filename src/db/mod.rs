use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tokio::task;
use crate::error::{Result, FlavorError};

pub mod migrate;

// WAL for concurrent readers, NORMAL sync, 64MB page cache, in-memory temp store
const CONNECTION_PRAGMAS: &str = "PRAGMA journal_mode = WAL; \
     PRAGMA synchronous = NORMAL; \
     PRAGMA foreign_keys = ON; \
     PRAGMA temp_store = MEMORY; \
     PRAGMA cache_size = -65536; \
     PRAGMA busy_timeout = 5000;";

/// Database connection wrapper
#[derive(Debug, Clone)]
pub struct Db {
    path: PathBuf,
}

impl Db {
    /// Create a new database connection manager
    pub fn new<P: AsRef<Path>>(db_path: P) -> Self {
        Self {
            path: db_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new database connection with the standard pragmas applied
    pub fn open_connection(&self) -> Result<Connection> {
        open(&self.path)
    }

    /// Execute a closure with a database connection in a blocking task
    ///
    /// Everything inside `f` runs to completion on one connection without
    /// yielding to the async runtime. Dropping the returned future does not
    /// stop `f`; long graph searches bound themselves with
    /// [`SearchLimits::deadline`](crate::graph::SearchLimits).
    pub async fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        task::spawn_blocking(move || {
            let mut conn = open(&path)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| FlavorError::Task(e.to_string()))?
    }

    /// Apply all pending schema migrations
    pub async fn migrate(&self) -> Result<()> {
        self.with_connection(|conn| migrate::run_migrations(conn)).await
    }
}

fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(CONNECTION_PRAGMAS)?;
    Ok(conn)
}

/// Fresh migrated database in a temp directory, for tests across the crate.
#[cfg(test)]
pub(crate) async fn test_db() -> (Db, tempfile::TempDir) {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let db = Db::new(temp_dir.path().join("test.db"));
    db.migrate().await.unwrap();
    (db, temp_dir)
}
