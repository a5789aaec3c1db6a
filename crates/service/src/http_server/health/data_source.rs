use std::fmt::Debug;
use std::ops::Deref;
use std::sync::Arc;

use axum::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use bytes::Bytes;
use chrono::{Duration, Utc};
use http::request::Parts;

use common::prelude::{DynKvStore, KvError};
use common::store::PutOptions;

use crate::ServiceState;

const PROBE_KEY: &str = "status:readyz";

#[async_trait]
pub trait DataSource {
    /// Perform various checks on the system to ensure its healthy and ready to accept requests.
    async fn is_ready(&self) -> Result<(), DataSourceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("one or more dependent services aren't available")]
    DependencyFailure,
}

pub type DynDataSource = Arc<dyn DataSource + Send + Sync>;

pub struct StateDataSource(DynDataSource);

impl Debug for StateDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateDataSource").finish()
    }
}

impl StateDataSource {
    #[cfg(test)]
    pub fn new(dds: DynDataSource) -> Self {
        Self(dds)
    }
}

impl Deref for StateDataSource {
    type Target = DynDataSource;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Ready when a short-lived probe key can be written and read back.
struct StoreSource {
    store: DynKvStore,
}

impl StoreSource {
    async fn round_trip(&self) -> Result<bool, KvError> {
        let stamp = Bytes::from(Utc::now().timestamp_millis().to_string());
        self.store
            .put(
                PROBE_KEY,
                stamp,
                PutOptions::expiring_at(Utc::now() + Duration::minutes(1)),
            )
            .await?;
        Ok(self.store.get(PROBE_KEY).await?.is_some())
    }
}

#[async_trait]
impl DataSource for StoreSource {
    async fn is_ready(&self) -> Result<(), DataSourceError> {
        match self.round_trip().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(DataSourceError::DependencyFailure),
            Err(e) => {
                tracing::error!("readiness probe failed: {}", e);
                Err(DataSourceError::DependencyFailure)
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for StateDataSource
where
    ServiceState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ();

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = ServiceState::from_ref(state);
        Ok(StateDataSource(Arc::new(StoreSource {
            store: state.engine().store().clone(),
        })))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[derive(Clone)]
    pub(crate) enum MockReadiness {
        DependencyFailure,
        Ready,
    }

    #[async_trait]
    impl DataSource for MockReadiness {
        async fn is_ready(&self) -> Result<(), DataSourceError> {
            use MockReadiness::*;

            match self {
                DependencyFailure => Err(DataSourceError::DependencyFailure),
                Ready => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn test_store_round_trip() {
        let source = StoreSource {
            store: Arc::new(common::prelude::MemoryKvStore::new()),
        };
        assert!(source.is_ready().await.is_ok());
    }
}
