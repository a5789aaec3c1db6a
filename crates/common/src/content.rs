//! Content-addressed blob storage.
//!
//! Blobs live under `blob:{hash}` where `hash` is the standard base64
//!  SHA-256 of the bytes, so identical uploads from any number of sites
//!  share one record. Every write of a hash replaces the stored
//!  metadata and expiry with the latest writer's: a blob's lifetime is
//!  the most recent writer's, not the longest-lived referrer's.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::store::{DynKvStore, KvError, PutOptions};

/// Who last wrote a blob. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub path: String,
    pub public_key: String,
}

/// `base64(sha256(bytes))`
pub fn content_hash(bytes: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(bytes))
}

pub(crate) fn blob_key(hash: &str) -> String {
    format!("blob:{}", hash)
}

#[derive(Debug, Clone)]
pub struct ContentStore {
    store: DynKvStore,
}

impl ContentStore {
    pub fn new(store: DynKvStore) -> Self {
        Self { store }
    }

    /// Store `bytes`, overwriting value, metadata and expiry of any
    ///  existing blob with the same hash. Returns the hash.
    pub async fn put(
        &self,
        bytes: Bytes,
        path: &str,
        public_key: &str,
        expiration: DateTime<Utc>,
    ) -> Result<String, KvError> {
        let hash = content_hash(&bytes);
        let metadata = serde_json::to_value(BlobMetadata {
            path: path.to_string(),
            public_key: public_key.to_string(),
        })?;
        tracing::debug!(%hash, size = bytes.len(), "writing blob");
        self.store
            .put(
                &blob_key(&hash),
                bytes,
                PutOptions::expiring_at(expiration).with_metadata(metadata),
            )
            .await?;
        Ok(hash)
    }

    pub async fn get(&self, hash: &str) -> Result<Option<Bytes>, KvError> {
        Ok(self.store.get(&blob_key(hash)).await?.map(|v| v.value))
    }

    /// Metadata and expiry of the most recent write of `hash`.
    pub async fn describe(
        &self,
        hash: &str,
    ) -> Result<Option<(BlobMetadata, Option<DateTime<Utc>>)>, KvError> {
        let Some(record) = self.store.get(&blob_key(hash)).await? else {
            return Ok(None);
        };
        let metadata = match record.metadata {
            Some(raw) => serde_json::from_value(raw)?,
            None => return Ok(None),
        };
        Ok(Some((metadata, record.expiration)))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Duration;

    use super::*;
    use crate::store::{KvStore, MemoryKvStore};

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash(b"this is a test file"),
            "WIFwflSwES+QG8g6H/usrI+rdOpGpvcGo+/F99TBxiU="
        );
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let content = ContentStore::new(Arc::new(MemoryKvStore::new()));
        let expiry = Utc::now() + Duration::minutes(5);

        let hash = content
            .put(Bytes::from_static(b"hello"), "/a", "site1", expiry)
            .await
            .unwrap();
        assert_eq!(hash, content_hash(b"hello"));
        assert_eq!(
            content.get(&hash).await.unwrap(),
            Some(Bytes::from_static(b"hello"))
        );
        assert_eq!(content.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_writer_wins_metadata_and_expiry() {
        let store = Arc::new(MemoryKvStore::new());
        let content = ContentStore::new(store.clone());
        let long = Utc::now() + Duration::days(30);
        let short = Utc::now() + Duration::minutes(1);

        let first = content
            .put(Bytes::from_static(b"same"), "/one", "site1", long)
            .await
            .unwrap();
        let second = content
            .put(Bytes::from_static(b"same"), "/two", "site2", short)
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(store.list("blob:").await.unwrap().len(), 1);

        let (metadata, expiration) = content.describe(&first).await.unwrap().unwrap();
        assert_eq!(
            metadata,
            BlobMetadata {
                path: "/two".to_string(),
                public_key: "site2".to_string(),
            }
        );
        // the later, shorter-lived writer governs the blob's lifetime
        assert_eq!(expiration, Some(short));
    }
}
