use bytes::Bytes;
use chrono::Duration;
use url::Url;

use super::keys::{new_public_key, new_secret_key, secrets_match};
use super::{now_millis, site_key, Site, SiteSettings, CREATED_PREFIX};
use crate::credential;
use crate::error::SiteError;
use crate::store::{DynKvStore, KvError, PutOptions};

// Collisions in a 36^20 key space mean something is badly wrong; give up quickly.
const MAX_KEY_ATTEMPTS: usize = 5;

/// A freshly minted site plus creation bookkeeping.
#[derive(Debug, Clone)]
pub struct SiteCreated {
    pub site: Site,
    /// Approximate number of sites created in the last 24 hours, this one included
    pub sites_created_24h: u64,
}

/// Mints sites, authenticates writers and answers existence checks.
#[derive(Debug, Clone)]
pub struct SiteRegistry {
    store: DynKvStore,
    settings: SiteSettings,
}

impl SiteRegistry {
    pub fn new(store: DynKvStore, settings: SiteSettings) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &SiteSettings {
        &self.settings
    }

    /// Validate a creation token and mint a new site under `base_url`.
    pub async fn create(&self, token: &[u8], base_url: &Url) -> Result<SiteCreated, SiteError> {
        if !credential::is_valid(token, &self.settings.threshold) {
            tracing::warn!("rejected site creation with invalid token");
            return Err(SiteError::Forbidden("Invalid Authorisation header".to_string()));
        }

        let created_at = now_millis();
        let base = base_url.as_str().trim_end_matches('/');

        for attempt in 1..=MAX_KEY_ATTEMPTS {
            let public_key = new_public_key();
            let site = Site {
                url: format!("{}/{}/", base, public_key),
                public_key,
                secret_key: new_secret_key(),
                created_at,
                expires_at: created_at + self.settings.lifetime,
                upload_expires_at: created_at + self.settings.upload_window,
            };

            let record = Bytes::from(serde_json::to_vec(&site)?);
            let written = self
                .store
                .put_if_absent(
                    &site_key(&site.public_key),
                    record,
                    PutOptions::expiring_at(site.expires_at),
                )
                .await?;
            if !written {
                tracing::warn!(attempt, public_key = %site.public_key, "public key collision, retrying");
                continue;
            }

            let sites_created_24h = self.record_creation(&site).await?;
            tracing::info!(
                public_key = %site.public_key,
                sites_created_24h,
                expires_at = %site.expires_at,
                "created new site"
            );
            return Ok(SiteCreated {
                site,
                sites_created_24h,
            });
        }

        Err(SiteError::Storage(KvError::Backend(format!(
            "no unused public key after {} attempts",
            MAX_KEY_ATTEMPTS
        ))))
    }

    // Each creation leaves its own day-long marker; counting live markers
    //  gives the rolling figure without a shared counter.
    async fn record_creation(&self, site: &Site) -> Result<u64, SiteError> {
        let marker = format!("{}{}", CREATED_PREFIX, site.public_key);
        self.store
            .put(
                &marker,
                Bytes::new(),
                PutOptions::expiring_at(site.created_at + Duration::hours(24)),
            )
            .await?;
        Ok(self.store.list(CREATED_PREFIX).await?.len() as u64)
    }

    /// Load a live site.
    pub async fn lookup(&self, public_key: &str) -> Result<Site, SiteError> {
        let Some(record) = self.store.get(&site_key(public_key)).await? else {
            return Err(SiteError::site_not_found(public_key));
        };
        let site: Site = serde_json::from_slice(&record.value)?;
        if !site.is_live_at(now_millis()) {
            return Err(SiteError::site_not_found(public_key));
        }
        Ok(site)
    }

    /// Check that `presented_secret` may write to the site.
    pub async fn authenticate_write(
        &self,
        public_key: &str,
        presented_secret: &str,
    ) -> Result<Site, SiteError> {
        let site = self.lookup(public_key).await?;
        if !secrets_match(presented_secret, &site.secret_key) {
            tracing::warn!(%public_key, "rejected upload with wrong secret key");
            return Err(SiteError::Forbidden("Invalid Authorisation header".to_string()));
        }
        if !site.accepts_uploads_at(now_millis()) {
            return Err(SiteError::Forbidden(format!(
                "Upload window for site \"{}\" has expired",
                public_key
            )));
        }
        Ok(site)
    }
}
