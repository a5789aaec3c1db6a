//! Shared setup for engine integration tests
#![allow(dead_code)]

use std::sync::Arc;

use common::prelude::*;
use url::Url;

pub fn base_url() -> Url {
    Url::parse("https://example.com").unwrap()
}

/// An engine over a fresh in-memory store with the testing profile
pub fn setup_engine() -> (Engine, MemoryKvStore) {
    setup_engine_with(SiteSettings::testing())
}

pub fn setup_engine_with(settings: SiteSettings) -> (Engine, MemoryKvStore) {
    let store = MemoryKvStore::new();
    let engine = Engine::new(Arc::new(store.clone()), settings);
    (engine, store)
}

/// Create a site with a token every testing threshold accepts
pub async fn create_site(engine: &Engine) -> Site {
    engine
        .create_site(b"abcd", &base_url())
        .await
        .unwrap()
        .site
}
