use std::sync::Arc;

use common::prelude::{DynKvStore, Engine, MemoryKvStore, SiteSettings};

use super::config::Config;
use super::database::{Database, DatabaseSetupError, SqliteKvStore};

/// Main service state, shared by every request handler
#[derive(Debug, Clone)]
pub struct State {
    engine: Engine,
    // set when running on sqlite, so the reaper can purge it
    sqlite: Option<SqliteKvStore>,
}

impl State {
    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        let settings = config.site_settings();

        if config.memory_store {
            tracing::info!("using in-process memory store");
            return Ok(Self::from_store(Arc::new(MemoryKvStore::new()), settings));
        }

        let database = match config.sqlite_path {
            Some(ref path) => {
                tracing::info!(path = %path.display(), "opening sqlite database");
                Database::connect(path).await?
            }
            None => {
                tracing::info!("using in-memory sqlite database");
                Database::in_memory().await?
            }
        };
        let sqlite = SqliteKvStore::new(database);

        Ok(Self {
            engine: Engine::new(Arc::new(sqlite.clone()), settings),
            sqlite: Some(sqlite),
        })
    }

    /// State over an arbitrary store, with no background maintenance.
    pub fn from_store(store: DynKvStore, settings: SiteSettings) -> Self {
        Self {
            engine: Engine::new(store, settings),
            sqlite: None,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn sqlite(&self) -> Option<&SqliteKvStore> {
        self.sqlite.as_ref()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("failed to setup the database: {0}")]
    DatabaseSetupError(#[from] DatabaseSetupError),
}
