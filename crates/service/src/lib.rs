//! HTTP surface and process lifecycle for smokeshow.
//!
//! This crate wires the storage engine from `common` into a running service:
//! - Database (SQLite-backed keyed store and its expiry reaper)
//! - State management (ServiceState wrapping the engine)
//! - HTTP handlers (site creation, upload, serving, health checks)
//! - Process setup (logging, signals, graceful shutdown)

pub mod config;
pub mod database;
pub mod http_server;
pub mod process;
pub mod state;

pub use config::{Config, ConfigError, ConfigFile};
pub use database::{Database, DatabaseSetupError, SqliteKvStore};
pub use state::{State as ServiceState, StateSetupError};
