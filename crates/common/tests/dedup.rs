//! Content deduplication across unrelated sites

mod harness;

use common::content::content_hash;
use common::prelude::*;
use common::site::FileEntry;

const CONTENT: &[u8] = b"this is a test file";
const CONTENT_HASH: &str = "WIFwflSwES+QG8g6H/usrI+rdOpGpvcGo+/F99TBxiU=";

async fn blob_hash(engine: &Engine, site: &Site, path: &str) -> String {
    match engine.index().get_file(site, path).await.unwrap().unwrap() {
        FileEntry::Blob { hash, .. } => hash,
        other => panic!("expected a blob entry, got {other:?}"),
    }
}

#[tokio::test]
async fn test_identical_content_shares_one_blob() {
    let (engine, store) = harness::setup_engine();
    let first = harness::create_site(&engine).await;
    let second = harness::create_site(&engine).await;

    engine
        .upload(&first.public_key, &first.secret_key, NewFile::new("/a.txt", CONTENT))
        .await
        .unwrap();
    engine
        .upload(&second.public_key, &second.secret_key, NewFile::new("/b/c.txt", CONTENT))
        .await
        .unwrap();

    assert_eq!(content_hash(CONTENT), CONTENT_HASH);
    assert_eq!(blob_hash(&engine, &first, "/a.txt").await, CONTENT_HASH);
    assert_eq!(blob_hash(&engine, &second, "/b/c.txt").await, CONTENT_HASH);
    assert_eq!(store.list("blob:").await.unwrap().len(), 1);

    for (site, path) in [(&first, "/a.txt"), (&second, "/b/c.txt")] {
        let resolved = engine.resolve(&site.public_key, path).await.unwrap();
        assert_eq!(resolved.status, 200);
        assert_eq!(&resolved.body[..], CONTENT);
    }

    // metadata records the most recent writer only
    let (metadata, _) = engine.content().describe(CONTENT_HASH).await.unwrap().unwrap();
    assert_eq!(metadata.public_key, second.public_key);
    assert_eq!(metadata.path, "/b/c.txt");
}

#[tokio::test]
async fn test_same_path_same_bytes_in_one_site() {
    let (engine, store) = harness::setup_engine();
    let site = harness::create_site(&engine).await;

    for path in ["/one", "/two", "/three"] {
        engine
            .upload(&site.public_key, &site.secret_key, NewFile::new(path, CONTENT))
            .await
            .unwrap();
    }
    assert_eq!(store.list("blob:").await.unwrap().len(), 1);
    assert_eq!(
        engine.index().total(&site).await.unwrap(),
        3 * CONTENT.len() as u64
    );
}
