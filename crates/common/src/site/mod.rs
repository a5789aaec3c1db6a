mod index;
mod keys;
mod manifest;
mod registry;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::credential::Threshold;

pub use index::{FileEntry, NewFile, SiteIndex, UploadResult};
pub use keys::{is_public_key, new_public_key, new_secret_key, secrets_match, PUBLIC_KEY_LENGTH};
pub use manifest::{Manifest, MANIFEST_CONTENT_TYPE, MANIFEST_PATH};
pub use registry::{SiteCreated, SiteRegistry};

/// Default maximum bytes accepted per site (30 MiB)
pub const DEFAULT_MAX_SITE_SIZE: u64 = 30 * 1024 * 1024;

/// Tunables shared by every component that touches a site.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// How long a site and everything written to it lives
    pub lifetime: Duration,
    /// How long after creation uploads are accepted
    pub upload_window: Duration,
    /// Proof-of-work threshold for creation tokens
    pub threshold: Threshold,
    /// Cap on the running total of uploaded bytes
    pub max_site_size: u64,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            lifetime: Duration::days(30),
            upload_window: Duration::hours(1),
            threshold: Threshold::default(),
            max_site_size: DEFAULT_MAX_SITE_SIZE,
        }
    }
}

impl SiteSettings {
    /// Short-lived sites and a threshold every token passes.
    pub fn testing() -> Self {
        Self {
            lifetime: Duration::seconds(90),
            upload_window: Duration::seconds(70),
            threshold: Threshold::new(260),
            max_site_size: DEFAULT_MAX_SITE_SIZE,
        }
    }
}

/// A minted site. Stored as JSON under `site:{public_key}` until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub public_key: String,
    pub secret_key: String,
    pub url: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub expires_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub upload_expires_at: DateTime<Utc>,
}

impl Site {
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn accepts_uploads_at(&self, now: DateTime<Utc>) -> bool {
        now < self.upload_expires_at
    }

    pub fn info(&self) -> SiteInfo {
        SiteInfo {
            url: self.url.clone(),
            site_creation: self.created_at,
            site_expiration: self.expires_at,
        }
    }
}

/// Public summary of a site, the header of its manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub url: String,
    #[serde(with = "timestamp")]
    pub site_creation: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub site_expiration: DateTime<Utc>,
}

impl SiteInfo {
    /// Indented JSON rendering. Its byte length is charged to the
    ///  site's reported size.
    pub fn to_document(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Current time truncated to whole milliseconds, the precision
///  timestamps are rendered and stored with.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

pub(crate) fn site_key(public_key: &str) -> String {
    format!("site:{}", public_key)
}

pub(crate) fn index_prefix(public_key: &str) -> String {
    format!("index:{}:", public_key)
}

pub(crate) fn index_key(public_key: &str, path: &str) -> String {
    format!("index:{}:{}", public_key, path)
}

pub(crate) fn total_key(public_key: &str) -> String {
    format!("total:{}", public_key)
}

pub(crate) const CREATED_PREFIX: &str = "created:";

/// `YYYY-MM-DDTHH:MM:SS.sssZ` timestamps.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
