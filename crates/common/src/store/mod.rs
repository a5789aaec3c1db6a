mod memory;

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

pub use memory::MemoryKvStore;

/// Errors surfaced by a durable keyed store backend.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// The backend could not complete the operation
    #[error("store backend error: {0}")]
    Backend(String),
    /// Metadata could not be encoded or decoded
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Options attached to a single `put`.
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// Free-form metadata stored alongside the value and returned by `get`/`list`
    pub metadata: Option<serde_json::Value>,
    /// Absolute instant after which the entry is no longer visible
    pub expiration: Option<DateTime<Utc>>,
}

impl PutOptions {
    pub fn expiring_at(expiration: DateTime<Utc>) -> Self {
        Self {
            metadata: None,
            expiration: Some(expiration),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A value read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct KvValue {
    pub value: Bytes,
    pub metadata: Option<serde_json::Value>,
    pub expiration: Option<DateTime<Utc>>,
}

/// A key returned from a prefix listing, without its value.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyInfo {
    pub key: String,
    pub metadata: Option<serde_json::Value>,
    pub expiration: Option<DateTime<Utc>>,
}

/// Whether an entry with the given expiration is still visible at `now`.
pub fn is_live(expiration: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match expiration {
        Some(expiration) => expiration > now,
        None => true,
    }
}

/// The durable keyed store the engine is built on.
///
/// Only these four operations (plus the conditional write, which
/// falls back to them) are ever issued; no multi-key transactions
/// are assumed. Entries past their expiration must be invisible to
/// `get` and `list`.
#[async_trait]
pub trait KvStore: Send + Sync + Debug {
    /// Write `value` under `key`, replacing any previous value,
    ///  metadata and expiration unconditionally
    async fn put(&self, key: &str, value: Bytes, options: PutOptions) -> Result<(), KvError>;

    /// Read the live value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<KvValue>, KvError>;

    /// Remove `key`. Removing a missing key is not an error
    async fn delete(&self, key: &str) -> Result<(), KvError>;

    /// List every live key starting with `prefix`, sorted by key
    async fn list(&self, prefix: &str) -> Result<Vec<KeyInfo>, KvError>;

    /// Write `value` only if no live entry exists under `key`.
    ///
    /// Returns `true` if the write happened. The default is a plain
    ///  read followed by a write; backends with a native conditional
    ///  write should override it.
    async fn put_if_absent(
        &self,
        key: &str,
        value: Bytes,
        options: PutOptions,
    ) -> Result<bool, KvError> {
        if self.get(key).await?.is_some() {
            return Ok(false);
        }
        self.put(key, value, options).await?;
        Ok(true)
    }
}

pub type DynKvStore = Arc<dyn KvStore>;
