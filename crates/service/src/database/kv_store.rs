use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use common::store::{KeyInfo, KvError, KvStore, KvValue, PutOptions};

use super::Database;

/// [`KvStore`] over the `kv_entries` table.
///
/// Expired rows stay on disk until [`SqliteKvStore::reap_expired`] runs,
///  but every read filters them out.
#[derive(Debug, Clone)]
pub struct SqliteKvStore {
    db: Database,
}

impl SqliteKvStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Delete every row whose expiry has passed. Returns the number removed.
    pub async fn reap_expired(&self) -> Result<u64, KvError> {
        let result = sqlx::query(
            "DELETE FROM kv_entries WHERE expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(Utc::now().timestamp_millis())
        .execute(&*self.db)
        .await
        .map_err(backend)?;
        Ok(result.rows_affected())
    }
}

fn backend(err: sqlx::Error) -> KvError {
    tracing::error!(%err, "sqlite store failure");
    KvError::Backend(err.to_string())
}

fn encode_metadata(metadata: &Option<serde_json::Value>) -> Result<Option<String>, KvError> {
    Ok(match metadata {
        Some(value) => Some(serde_json::to_string(value)?),
        None => None,
    })
}

fn decode_metadata(row: &SqliteRow) -> Result<Option<serde_json::Value>, KvError> {
    let raw: Option<String> = row.try_get("metadata").map_err(backend)?;
    Ok(match raw {
        Some(raw) => Some(serde_json::from_str(&raw)?),
        None => None,
    })
}

fn decode_expiration(row: &SqliteRow) -> Result<Option<DateTime<Utc>>, KvError> {
    let raw: Option<i64> = row.try_get("expires_at").map_err(backend)?;
    raw.map(|ms| {
        DateTime::from_timestamp_millis(ms)
            .ok_or_else(|| KvError::Backend(format!("expiry out of range: {}", ms)))
    })
    .transpose()
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn put(&self, key: &str, value: Bytes, options: PutOptions) -> Result<(), KvError> {
        tracing::debug!(%key, size = value.len(), "sqlite put");
        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, metadata, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                metadata = excluded.metadata,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value.as_ref())
        .bind(encode_metadata(&options.metadata)?)
        .bind(options.expiration.map(|e| e.timestamp_millis()))
        .execute(&*self.db)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<KvValue>, KvError> {
        let row = sqlx::query(
            r#"
            SELECT value, metadata, expires_at FROM kv_entries
            WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)
            "#,
        )
        .bind(key)
        .bind(Utc::now().timestamp_millis())
        .fetch_optional(&*self.db)
        .await
        .map_err(backend)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let value: Vec<u8> = row.try_get("value").map_err(backend)?;
        Ok(Some(KvValue {
            value: Bytes::from(value),
            metadata: decode_metadata(&row)?,
            expiration: decode_expiration(&row)?,
        }))
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&*self.db)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<KeyInfo>, KvError> {
        // substr/length count characters for TEXT, so compare on the same unit
        let rows = sqlx::query(
            r#"
            SELECT key, metadata, expires_at FROM kv_entries
            WHERE substr(key, 1, ?) = ? AND (expires_at IS NULL OR expires_at > ?)
            ORDER BY key
            "#,
        )
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .bind(Utc::now().timestamp_millis())
        .fetch_all(&*self.db)
        .await
        .map_err(backend)?;

        rows.iter()
            .map(|row| -> Result<KeyInfo, KvError> {
                Ok(KeyInfo {
                    key: row.try_get("key").map_err(backend)?,
                    metadata: decode_metadata(row)?,
                    expiration: decode_expiration(row)?,
                })
            })
            .collect()
    }

    async fn put_if_absent(
        &self,
        key: &str,
        value: Bytes,
        options: PutOptions,
    ) -> Result<bool, KvError> {
        let now = Utc::now().timestamp_millis();
        let mut tx = self.db.begin().await.map_err(backend)?;

        // a dead row must not block the key
        sqlx::query(
            "DELETE FROM kv_entries WHERE key = ? AND expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(key)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, metadata, expires_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(value.as_ref())
        .bind(encode_metadata(&options.metadata)?)
        .bind(options.expiration.map(|e| e.timestamp_millis()))
        .execute(&mut *tx)
        .await
        .map_err(backend)?
        .rows_affected();

        tx.commit().await.map_err(backend)?;
        Ok(inserted == 1)
    }
}
