//! SQLite connection handling and migration tooling.
//!
//! A [`Database`] owns one connection behind a mutex. All access goes through
//! [`Database::call`], which runs the closure on tokio's blocking pool so the
//! async executor is never stalled by disk I/O, and which serializes writers
//! against each other and against readers.

pub mod favorites;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, Connection};
use thiserror::Error;

pub use favorites::{FavoriteRecord, FavoriteStore, SqliteFavoriteStore, FAVORITES_MIGRATION};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Migration definition contributed by a module.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

/// Failures of the local persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to prepare database directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("migration {module}/{id} failed: {source}")]
    Migration {
        module: String,
        id: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("storage worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// Shared handle to the local SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create the database file, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Directory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        tracing::info!(target: "bookstore-db", path = %path.display(), "database opened");

        Ok(Self::from_connection(conn))
    }

    /// Open a transient database that lives as long as this handle.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` with exclusive access to the connection on the blocking pool.
    ///
    /// The closure runs to completion even if the returned future is dropped.
    pub async fn call<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<R, StoreError> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await?
    }

    /// Apply every migration not yet recorded in `schema_migrations`.
    ///
    /// Each migration runs in its own transaction. Returns the number applied.
    pub async fn migrate(&self, migrations: &[(String, Migration)]) -> Result<usize, StoreError> {
        let migrations = migrations.to_vec();
        self.call(move |conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS schema_migrations (
                    module TEXT NOT NULL,
                    id TEXT NOT NULL,
                    applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    PRIMARY KEY (module, id)
                )",
            )?;

            let mut applied = 0;
            for (module, migration) in migrations {
                let done: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM schema_migrations WHERE module = ?1 AND id = ?2",
                    params![module, migration.id],
                    |row| row.get(0),
                )?;
                if done > 0 {
                    continue;
                }

                let tx = conn.transaction()?;
                tx.execute_batch(migration.up)
                    .map_err(|source| StoreError::Migration {
                        module: module.clone(),
                        id: migration.id,
                        source,
                    })?;
                tx.execute(
                    "INSERT INTO schema_migrations (module, id) VALUES (?1, ?2)",
                    params![module, migration.id],
                )?;
                tx.commit()?;

                tracing::info!(
                    target: "bookstore-db",
                    module = %module,
                    migration = migration.id,
                    "migration applied"
                );
                applied += 1;
            }

            Ok(applied)
        })
        .await
    }
}
