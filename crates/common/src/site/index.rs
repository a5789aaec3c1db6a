use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::manifest::{Manifest, MANIFEST_CONTENT_TYPE, MANIFEST_PATH};
use super::{index_key, index_prefix, total_key, Site, SiteSettings};
use crate::content::ContentStore;
use crate::error::SiteError;
use crate::store::{DynKvStore, PutOptions};

/// What a site path is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileEntry {
    /// Reference into the content store
    Blob {
        hash: String,
        size: u64,
        content_type: String,
        /// Extra headers replayed when the file is served
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        headers: Vec<(String, String)>,
    },
    /// Content held directly in the entry; only the manifest uses this
    Inline { content_type: String, body: String },
}

impl FileEntry {
    pub fn content_type(&self) -> &str {
        match self {
            FileEntry::Blob { content_type, .. } | FileEntry::Inline { content_type, .. } => {
                content_type
            }
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            FileEntry::Blob { size, .. } => *size,
            FileEntry::Inline { body, .. } => body.len() as u64,
        }
    }

    pub fn headers(&self) -> &[(String, String)] {
        match self {
            FileEntry::Blob { headers, .. } => headers,
            FileEntry::Inline { .. } => &[],
        }
    }
}

/// A file as received from an uploader.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub path: String,
    pub body: Bytes,
    /// Declared content type; guessed from the path when absent
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl NewFile {
    pub fn new(path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            path: path.into(),
            body: body.into(),
            content_type: None,
            headers: Vec::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Outcome of one accepted upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub path: String,
    pub content_type: String,
    pub size: u64,
    /// Running total after this upload. Concurrent uploads to the same
    ///  site may each observe a stale base, so this can under-count.
    pub total_site_size: u64,
}

/// Per-site path bindings, size accounting and manifest upkeep.
///
/// The running total and the manifest are read-modify-write against a
///  single key each. Concurrent uploads to one site can lose updates to
///  either; the only guarantee is that a single writer's totals never
///  decrease.
#[derive(Debug, Clone)]
pub struct SiteIndex {
    store: DynKvStore,
    content: ContentStore,
    settings: SiteSettings,
}

impl SiteIndex {
    pub fn new(store: DynKvStore, content: ContentStore, settings: SiteSettings) -> Self {
        Self {
            store,
            content,
            settings,
        }
    }

    /// Bind `file` into `site`, which the caller has already authenticated.
    pub async fn put_file(&self, site: &Site, file: NewFile) -> Result<UploadResult, SiteError> {
        validate_path(&file.path)?;
        if file.path == MANIFEST_PATH {
            return Err(SiteError::Forbidden(format!(
                "Overwriting \"{}\" is forbidden",
                MANIFEST_PATH
            )));
        }
        if file.body.is_empty() {
            return Err(SiteError::Validation("Request body is empty".to_string()));
        }

        let size = file.body.len() as u64;
        let current = self.total(site).await?;
        if current + size > self.settings.max_site_size {
            return Err(SiteError::LimitExceeded(format!(
                "You've exceeded the site size limit of {} bytes",
                self.settings.max_site_size
            )));
        }

        let content_type = file.content_type.unwrap_or_else(|| {
            mime_guess::from_path(&file.path)
                .first_or_octet_stream()
                .to_string()
        });

        let hash = self
            .content
            .put(file.body, &file.path, &site.public_key, site.expires_at)
            .await?;

        let entry = FileEntry::Blob {
            hash,
            size,
            content_type: content_type.clone(),
            headers: file.headers,
        };
        self.write_entry(site, &file.path, &entry).await?;

        let total_site_size = self.add_to_total(site, size).await?;
        self.write_manifest(site, total_site_size).await?;

        tracing::info!(
            public_key = %site.public_key,
            path = %file.path,
            size,
            total_site_size,
            "stored file"
        );
        Ok(UploadResult {
            path: file.path,
            content_type,
            size,
            total_site_size,
        })
    }

    pub async fn get_file(&self, site: &Site, path: &str) -> Result<Option<FileEntry>, SiteError> {
        let key = index_key(&site.public_key, path);
        tracing::debug!(%key, "index lookup");
        match self.store.get(&key).await? {
            Some(record) => Ok(Some(serde_json::from_slice(&record.value)?)),
            None => Ok(None),
        }
    }

    /// Every bound path except the manifest, sorted.
    pub async fn list_paths(&self, site: &Site) -> Result<Vec<String>, SiteError> {
        let prefix = index_prefix(&site.public_key);
        let mut paths: Vec<String> = self
            .store
            .list(&prefix)
            .await?
            .into_iter()
            .filter_map(|info| info.key.strip_prefix(&prefix).map(str::to_string))
            .filter(|path| path != MANIFEST_PATH)
            .collect();
        paths.sort();
        Ok(paths)
    }

    /// Current running total of uploaded bytes, excluding the manifest.
    pub async fn total(&self, site: &Site) -> Result<u64, SiteError> {
        let Some(record) = self.store.get(&total_key(&site.public_key)).await? else {
            return Ok(0);
        };
        std::str::from_utf8(&record.value)
            .ok()
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| SiteError::Corrupt(format!("running total for {}", site.public_key)))
    }

    async fn add_to_total(&self, site: &Site, size: u64) -> Result<u64, SiteError> {
        let total = self.total(site).await? + size;
        self.store
            .put(
                &total_key(&site.public_key),
                Bytes::from(total.to_string()),
                PutOptions::expiring_at(site.expires_at),
            )
            .await?;
        Ok(total)
    }

    /// Regenerate the manifest from the current path listing.
    pub async fn write_manifest(&self, site: &Site, uploaded_bytes: u64) -> Result<Manifest, SiteError> {
        let files = self.list_paths(site).await?;
        let manifest = Manifest::build(site, files, uploaded_bytes)?;
        let entry = FileEntry::Inline {
            content_type: MANIFEST_CONTENT_TYPE.to_string(),
            body: manifest.render()?,
        };
        self.write_entry(site, MANIFEST_PATH, &entry).await?;
        Ok(manifest)
    }

    async fn write_entry(&self, site: &Site, path: &str, entry: &FileEntry) -> Result<(), SiteError> {
        let metadata = json!({
            "size": entry.size(),
            "content_type": entry.content_type(),
        });
        self.store
            .put(
                &index_key(&site.public_key, path),
                Bytes::from(serde_json::to_vec(entry)?),
                PutOptions::expiring_at(site.expires_at).with_metadata(metadata),
            )
            .await?;
        Ok(())
    }
}

/// Site paths are absolute and free of control characters.
pub fn validate_path(path: &str) -> Result<(), SiteError> {
    if !path.starts_with('/') {
        return Err(SiteError::Validation(format!(
            "Path \"{}\" must start with \"/\"",
            path
        )));
    }
    if path.chars().any(char::is_control) {
        return Err(SiteError::Validation(
            "Path may not contain control characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use url::Url;

    use super::*;
    use crate::site::SiteRegistry;
    use crate::store::MemoryKvStore;

    async fn setup(settings: SiteSettings) -> (SiteIndex, Site) {
        let store: DynKvStore = Arc::new(MemoryKvStore::new());
        let registry = SiteRegistry::new(store.clone(), settings.clone());
        let base = Url::parse("https://example.com").unwrap();
        let site = registry.create(b"abcd", &base).await.unwrap().site;
        let index = SiteIndex::new(store.clone(), ContentStore::new(store), settings);
        (index, site)
    }

    #[tokio::test]
    async fn test_put_and_get_file() {
        let (index, site) = setup(SiteSettings::testing()).await;
        let result = index
            .put_file(
                &site,
                NewFile::new("/", &b"<h1>this is a test</h1>"[..]).with_content_type("text/html"),
            )
            .await
            .unwrap();
        assert_eq!(
            result,
            UploadResult {
                path: "/".to_string(),
                content_type: "text/html".to_string(),
                size: 23,
                total_site_size: 23,
            }
        );

        let entry = index.get_file(&site, "/").await.unwrap().unwrap();
        assert_eq!(entry.content_type(), "text/html");
        assert_eq!(entry.size(), 23);
        assert!(index.get_file(&site, "/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reupload_adds_to_total() {
        let (index, site) = setup(SiteSettings::testing()).await;
        let mut totals = Vec::new();
        for _ in 0..3 {
            let result = index
                .put_file(&site, NewFile::new("/same.txt", &b"12345"[..]))
                .await
                .unwrap();
            totals.push(result.total_site_size);
        }
        assert_eq!(totals, vec![5, 10, 15]);
        assert_eq!(index.list_paths(&site).await.unwrap(), vec!["/same.txt"]);
    }

    #[tokio::test]
    async fn test_content_type_is_guessed() {
        let (index, site) = setup(SiteSettings::testing()).await;
        let css = index
            .put_file(&site, NewFile::new("/style.css", &b"a{}"[..]))
            .await
            .unwrap();
        assert_eq!(css.content_type, "text/css");

        let unknown = index
            .put_file(&site, NewFile::new("/blob", &b"??"[..]))
            .await
            .unwrap();
        assert_eq!(unknown.content_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_manifest_is_maintained() {
        let (index, site) = setup(SiteSettings::testing()).await;
        index
            .put_file(&site, NewFile::new("/b.html", &b"b"[..]))
            .await
            .unwrap();
        index
            .put_file(&site, NewFile::new("/a.html", &b"aa"[..]))
            .await
            .unwrap();

        let entry = index.get_file(&site, MANIFEST_PATH).await.unwrap().unwrap();
        assert_eq!(entry.content_type(), "application/json");
        let FileEntry::Inline { body, .. } = entry else {
            panic!("manifest should be inline");
        };
        let manifest: Manifest = serde_json::from_str(&body).unwrap();
        assert_eq!(manifest.files, vec!["/a.html", "/b.html"]);
        let info_size = site.info().to_document().unwrap().len() as u64;
        assert_eq!(manifest.total_site_size, 3 + info_size);
    }

    #[tokio::test]
    async fn test_rejections() {
        let settings = SiteSettings {
            max_site_size: 10,
            ..SiteSettings::testing()
        };
        let (index, site) = setup(settings).await;

        let err = index
            .put_file(&site, NewFile::new(MANIFEST_PATH, &b"{}"[..]))
            .await
            .unwrap_err();
        assert!(matches!(err, SiteError::Forbidden(_)));

        let err = index
            .put_file(&site, NewFile::new("/empty", Bytes::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, SiteError::Validation(_)));

        let err = index
            .put_file(&site, NewFile::new("relative", &b"x"[..]))
            .await
            .unwrap_err();
        assert!(matches!(err, SiteError::Validation(_)));

        index
            .put_file(&site, NewFile::new("/ten", &b"0123456789"[..]))
            .await
            .unwrap();
        let err = index
            .put_file(&site, NewFile::new("/one-more", &b"x"[..]))
            .await
            .unwrap_err();
        assert!(matches!(err, SiteError::LimitExceeded(_)));
        assert_eq!(index.total(&site).await.unwrap(), 10);
    }
}
