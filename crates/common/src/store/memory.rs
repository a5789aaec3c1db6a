use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use super::{is_live, KeyInfo, KvError, KvStore, KvValue, PutOptions};

/// In-memory keyed store backed by an ordered map.
///
/// Expired entries are hidden on read and only dropped by
///  `put_if_absent`, which runs once per site creation rather than once
///  per file.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    inner: Arc<RwLock<BTreeMap<String, KvValue>>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, including expired ones not yet purged
    pub fn raw_len(&self) -> usize {
        self.inner.read().map(|map| map.len()).unwrap_or_default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> KvError {
    KvError::Backend(format!("memory store lock poisoned: {}", e))
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn put(&self, key: &str, value: Bytes, options: PutOptions) -> Result<(), KvError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.insert(
            key.to_string(),
            KvValue {
                value,
                metadata: options.metadata,
                expiration: options.expiration,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<KvValue>, KvError> {
        let inner = self.inner.read().map_err(poisoned)?;
        let now = Utc::now();
        Ok(inner
            .get(key)
            .filter(|entry| is_live(entry.expiration, now))
            .cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        inner.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<KeyInfo>, KvError> {
        let inner = self.inner.read().map_err(poisoned)?;
        let now = Utc::now();
        Ok(inner
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .filter(|(_, entry)| is_live(entry.expiration, now))
            .map(|(key, entry)| KeyInfo {
                key: key.clone(),
                metadata: entry.metadata.clone(),
                expiration: entry.expiration,
            })
            .collect())
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: Bytes,
        options: PutOptions,
    ) -> Result<bool, KvError> {
        let mut inner = self.inner.write().map_err(poisoned)?;
        let now = Utc::now();
        inner.retain(|_, entry| is_live(entry.expiration, now));
        if inner
            .get(key)
            .is_some_and(|entry| is_live(entry.expiration, now))
        {
            return Ok(false);
        }
        inner.insert(
            key.to_string(),
            KvValue {
                value,
                metadata: options.metadata,
                expiration: options.expiration,
            },
        );
        Ok(true)
    }
}
