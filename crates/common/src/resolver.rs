use bytes::Bytes;

use crate::content::ContentStore;
use crate::error::SiteError;
use crate::site::{FileEntry, Site, SiteIndex, SiteRegistry};

pub const STATUS_OK: u16 = 200;
pub const STATUS_NOT_FOUND: u16 = 404;

/// Path of the page a site may supply for its own misses
pub const CUSTOM_NOT_FOUND_PATH: &str = "/404.html";

const TEXT_PLAIN: &str = "text/plain";

/// A fully resolved response for a site path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub status: u16,
    pub body: Bytes,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
}

impl Resolved {
    fn text(status: u16, body: String) -> Self {
        Self {
            status,
            body: Bytes::from(body),
            content_type: TEXT_PLAIN.to_string(),
            headers: Vec::new(),
        }
    }
}

/// Maps request paths onto stored files.
///
/// Rules, in order: exact path; for paths ending in `/`, the same path
///  with the slash(es) replaced by `.html`; the site's `/404.html`
///  served with status 404; a plain-text 404.
#[derive(Debug, Clone)]
pub struct Resolver {
    registry: SiteRegistry,
    index: SiteIndex,
    content: ContentStore,
}

impl Resolver {
    pub fn new(registry: SiteRegistry, index: SiteIndex, content: ContentStore) -> Self {
        Self {
            registry,
            index,
            content,
        }
    }

    pub async fn resolve(&self, public_key: &str, raw_path: &str) -> Result<Resolved, SiteError> {
        let site = match self.registry.lookup(public_key).await {
            Ok(site) => site,
            Err(e @ SiteError::SiteNotFound { .. }) => {
                return Ok(Resolved::text(STATUS_NOT_FOUND, e.to_string()))
            }
            Err(e) => return Err(e),
        };

        if let Some(found) = self.load(&site, raw_path, STATUS_OK).await? {
            return Ok(found);
        }

        if let Some(candidate) = clean_url_candidate(raw_path) {
            if let Some(found) = self.load(&site, &candidate, STATUS_OK).await? {
                return Ok(found);
            }
        }

        if let Some(found) = self
            .load(&site, CUSTOM_NOT_FOUND_PATH, STATUS_NOT_FOUND)
            .await?
        {
            return Ok(found);
        }

        Ok(Resolved::text(
            STATUS_NOT_FOUND,
            SiteError::file_not_found(public_key, raw_path).to_string(),
        ))
    }

    async fn load(&self, site: &Site, path: &str, status: u16) -> Result<Option<Resolved>, SiteError> {
        let Some(entry) = self.index.get_file(site, path).await? else {
            return Ok(None);
        };
        let content_type = entry.content_type().to_string();
        let headers = entry.headers().to_vec();
        let body = match entry {
            FileEntry::Inline { body, .. } => Bytes::from(body),
            FileEntry::Blob { hash, .. } => match self.content.get(&hash).await? {
                Some(bytes) => bytes,
                None => {
                    // a later writer of the same bytes shortened the blob's life
                    tracing::warn!(
                        public_key = %site.public_key,
                        %path,
                        %hash,
                        "index entry outlived its blob"
                    );
                    return Ok(None);
                }
            },
        };
        Ok(Some(Resolved {
            status,
            body,
            content_type,
            headers,
        }))
    }
}

/// `/foo/` -> `/foo.html`. Bare `/` has no candidate.
pub fn clean_url_candidate(raw_path: &str) -> Option<String> {
    if !raw_path.ends_with('/') {
        return None;
    }
    let stem = raw_path.trim_end_matches('/');
    if stem.is_empty() {
        return None;
    }
    Some(format!("{}.html", stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_url_candidate() {
        assert_eq!(clean_url_candidate("/foobar/"), Some("/foobar.html".to_string()));
        assert_eq!(clean_url_candidate("/a/b//"), Some("/a/b.html".to_string()));
        assert_eq!(clean_url_candidate("/foobar"), None);
        assert_eq!(clean_url_candidate("/"), None);
    }
}
