use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{timestamp, Site};

/// Path of the generated summary file inside every site
pub const MANIFEST_PATH: &str = "/.smokeshow.json";
pub const MANIFEST_CONTENT_TYPE: &str = "application/json";

/// Generated summary of a site, served at [`MANIFEST_PATH`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub url: String,
    #[serde(with = "timestamp")]
    pub site_creation: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub site_expiration: DateTime<Utc>,
    /// Uploaded paths, sorted, never including the manifest itself
    pub files: Vec<String>,
    /// Running upload total plus the size of the site info document
    pub total_site_size: u64,
}

impl Manifest {
    pub fn build(site: &Site, mut files: Vec<String>, uploaded_bytes: u64) -> Result<Self, serde_json::Error> {
        let info = site.info();
        let info_size = info.to_document()?.len() as u64;
        files.retain(|path| path != MANIFEST_PATH);
        files.sort();
        files.dedup();
        Ok(Self {
            url: info.url,
            site_creation: info.site_creation,
            site_expiration: info.site_expiration,
            files,
            total_site_size: uploaded_bytes + info_size,
        })
    }

    pub fn render(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    #[test]
    fn test_build_sorts_and_excludes_itself() {
        let created_at = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        let site = Site {
            public_key: "abcdefghij0123456789".to_string(),
            secret_key: "secret".to_string(),
            url: "https://example.com/abcdefghij0123456789/".to_string(),
            created_at,
            expires_at: created_at + Duration::seconds(90),
            upload_expires_at: created_at + Duration::seconds(70),
        };

        let manifest = Manifest::build(
            &site,
            vec![
                "/z.html".to_string(),
                MANIFEST_PATH.to_string(),
                "/".to_string(),
                "/a/b.css".to_string(),
            ],
            23,
        )
        .unwrap();

        assert_eq!(manifest.files, vec!["/", "/a/b.css", "/z.html"]);
        assert_eq!(manifest.total_site_size, 175);

        let rendered = manifest.render().unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["site_expiration"], "2021-01-01T00:01:30.000Z");
        assert_eq!(value["files"][0], "/");
    }
}
