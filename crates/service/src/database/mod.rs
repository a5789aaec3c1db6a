mod kv_store;
mod reaper;

use std::ops::Deref;
use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

pub use kv_store::SqliteKvStore;
pub use reaper::{run_reaper, REAP_INTERVAL};

#[derive(Clone, Debug)]
pub struct Database(SqlitePool);

impl Database {
    /// Open (creating if missing) the database at `path` and bring its
    ///  schema up to date.
    pub async fn connect(path: &Path) -> Result<Self, DatabaseSetupError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(DatabaseSetupError::Unavailable)?;

        Self::migrate(pool).await
    }

    /// A private in-memory database. Limited to one connection, since
    ///  every sqlite connection to `:memory:` opens a distinct database.
    pub async fn in_memory() -> Result<Self, DatabaseSetupError> {
        let options = SqliteConnectOptions::new().filename(":memory:");

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(DatabaseSetupError::Unavailable)?;

        Self::migrate(pool).await
    }

    async fn migrate(pool: SqlitePool) -> Result<Self, DatabaseSetupError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DatabaseSetupError::MigrationFailed)?;
        Ok(Self(pool))
    }
}

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseSetupError {
    #[error("error occurred while attempting database migration: {0}")]
    MigrationFailed(sqlx::migrate::MigrateError),

    #[error("unable to perform initial connection and check of the database: {0}")]
    Unavailable(sqlx::Error),

    #[error("unable to prepare the database directory: {0}")]
    Io(#[from] std::io::Error),
}
