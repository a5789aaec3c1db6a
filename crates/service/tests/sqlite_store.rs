//! The engine running on the sqlite-backed store

use std::sync::Arc;

use common::prelude::*;
use common::site::Manifest;
use service::{Database, SqliteKvStore};
use url::Url;

async fn engine_on(db: Database) -> (Engine, SqliteKvStore) {
    let store = SqliteKvStore::new(db);
    let engine = Engine::new(Arc::new(store.clone()), SiteSettings::testing());
    (engine, store)
}

#[tokio::test]
async fn test_scenario_on_sqlite() {
    let (engine, store) = engine_on(Database::in_memory().await.unwrap()).await;
    let base = Url::parse("https://example.com").unwrap();

    let site = engine.create_site(b"abcd", &base).await.unwrap().site;
    let result = engine
        .upload(
            &site.public_key,
            &site.secret_key,
            NewFile::new("/", &b"<h1>this is a test</h1>"[..]).with_content_type("text/html"),
        )
        .await
        .unwrap();
    assert_eq!(result.total_site_size, 23);

    let manifest = engine.resolve(&site.public_key, MANIFEST_PATH).await.unwrap();
    let manifest: Manifest = serde_json::from_slice(&manifest.body).unwrap();
    assert_eq!(manifest.files, vec!["/"]);
    assert_eq!(manifest.total_site_size, 175);

    // one blob, one site record, two index entries (file + manifest)
    assert_eq!(store.list("blob:").await.unwrap().len(), 1);
    assert_eq!(store.list("site:").await.unwrap().len(), 1);
    assert_eq!(
        store
            .list(&format!("index:{}:", site.public_key))
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smokeshow.sqlite");
    let base = Url::parse("https://example.com").unwrap();

    let site = {
        let (engine, _) = engine_on(Database::connect(&path).await.unwrap()).await;
        let site = engine.create_site(b"abcd", &base).await.unwrap().site;
        engine
            .upload(
                &site.public_key,
                &site.secret_key,
                NewFile::new("/a.txt", &b"persisted"[..]),
            )
            .await
            .unwrap();
        site
    };

    let (engine, _) = engine_on(Database::connect(&path).await.unwrap()).await;
    let resolved = engine.resolve(&site.public_key, "/a.txt").await.unwrap();
    assert_eq!(resolved.status, 200);
    assert_eq!(&resolved.body[..], b"persisted");
    assert_eq!(resolved.content_type, "text/plain");
}
