//! Concurrent uploads to one site: every file lands, counters are best-effort

mod harness;

use futures::future::join_all;

use common::prelude::*;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_uploads_all_land() {
    let (engine, _) = harness::setup_engine();
    let site = harness::create_site(&engine).await;

    let uploads = (0..16).map(|i| {
        let engine = engine.clone();
        let site = site.clone();
        tokio::spawn(async move {
            engine
                .upload(
                    &site.public_key,
                    &site.secret_key,
                    NewFile::new(format!("/file-{i:02}.txt"), vec![b'x'; 10]),
                )
                .await
        })
    });
    let results: Vec<UploadResult> = join_all(uploads)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    // each file is individually bound and servable
    let paths = engine.index().list_paths(&site).await.unwrap();
    assert_eq!(paths.len(), 16);
    for path in &paths {
        let resolved = engine.resolve(&site.public_key, path).await.unwrap();
        assert_eq!(resolved.status, 200);
    }

    // lost updates may under-count, never over-count
    let total = engine.index().total(&site).await.unwrap();
    assert!(total <= 160);
    assert!(total >= 10);
    assert!(results.iter().all(|r| r.total_site_size <= 160));
}
