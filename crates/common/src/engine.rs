use url::Url;

use crate::content::ContentStore;
use crate::error::SiteError;
use crate::resolver::{Resolved, Resolver};
use crate::site::{NewFile, SiteCreated, SiteIndex, SiteRegistry, SiteSettings, UploadResult};
use crate::store::DynKvStore;

/// Wires the components over one injected store.
///
/// Holds no state of its own beyond handles, so clones may be used
///  freely from concurrent request handlers.
#[derive(Debug, Clone)]
pub struct Engine {
    store: DynKvStore,
    registry: SiteRegistry,
    content: ContentStore,
    index: SiteIndex,
    resolver: Resolver,
}

impl Engine {
    pub fn new(store: DynKvStore, settings: SiteSettings) -> Self {
        let content = ContentStore::new(store.clone());
        let registry = SiteRegistry::new(store.clone(), settings.clone());
        let index = SiteIndex::new(store.clone(), content.clone(), settings);
        let resolver = Resolver::new(registry.clone(), index.clone(), content.clone());
        Self {
            store,
            registry,
            content,
            index,
            resolver,
        }
    }

    pub fn store(&self) -> &DynKvStore {
        &self.store
    }

    pub fn registry(&self) -> &SiteRegistry {
        &self.registry
    }

    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    pub fn index(&self) -> &SiteIndex {
        &self.index
    }

    /// Mint a site and write its initial, empty manifest.
    pub async fn create_site(&self, token: &[u8], base_url: &Url) -> Result<SiteCreated, SiteError> {
        let created = self.registry.create(token, base_url).await?;
        self.index.write_manifest(&created.site, 0).await?;
        Ok(created)
    }

    /// Authenticate against the site and store one file.
    pub async fn upload(
        &self,
        public_key: &str,
        secret_key: &str,
        file: NewFile,
    ) -> Result<UploadResult, SiteError> {
        let site = self
            .registry
            .authenticate_write(public_key, secret_key)
            .await?;
        self.index.put_file(&site, file).await
    }

    pub async fn resolve(&self, public_key: &str, raw_path: &str) -> Result<Resolved, SiteError> {
        self.resolver.resolve(public_key, raw_path).await
    }
}
