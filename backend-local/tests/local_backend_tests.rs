//! End-to-end tests running the volume downloader against the local backend
//! and a SQLite volume index.

use backend_local::{LocalStorageBackend, SqliteVolumeIndex};
use backend_traits::{StorageBackend, VolumeId, VolumeIndex, VolumeInfo};
use core_restore::{BlockRequest, FailureLog, RestoreError, VolumeDownloader};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

struct Fixture {
    root: PathBuf,
    index: Arc<SqliteVolumeIndex>,
    backend: Arc<LocalStorageBackend>,
}

impl Fixture {
    async fn new() -> Self {
        let root = std::env::temp_dir().join(format!("bv-e2e-test-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&root).await.unwrap();

        let pool = SqlitePool::connect(":memory:").await.unwrap();
        let index = SqliteVolumeIndex::new(pool);
        index.initialize().await.unwrap();

        let backend = LocalStorageBackend::new(&root);

        Self {
            root,
            index: Arc::new(index),
            backend: Arc::new(backend),
        }
    }

    /// Writes a volume file and registers it in the index.
    async fn add_volume(&self, name: &str, payload: &[u8]) -> VolumeId {
        tokio::fs::write(self.root.join(name), payload).await.unwrap();

        let mut hasher = Sha256::new();
        hasher.update(payload);
        let hash = format!("{:x}", hasher.finalize());

        self.index
            .register(&VolumeInfo::new(name, payload.len() as i64, hash))
            .await
            .unwrap()
    }

    async fn cleanup(&self) {
        tokio::fs::remove_dir_all(&self.root).await.ok();
    }
}

#[tokio::test]
async fn restore_fetches_waits_and_evicts() {
    let fixture = Fixture::new().await;
    let v1 = fixture.add_volume("vault-b0001.zvol", b"first volume payload").await;
    let v2 = fixture.add_volume("vault-b0002.zvol", b"second volume payload").await;

    let failures = FailureLog::new();
    let downloader = VolumeDownloader::new(
        fixture.index.clone(),
        fixture.backend.clone(),
        failures.clone(),
    );
    let mut spawned = downloader.spawn();

    for request in [
        BlockRequest::Fetch(v1),
        BlockRequest::Fetch(v2),
        BlockRequest::Fetch(v1),
    ] {
        spawned.requests.send(request).await.unwrap();
    }

    let (_, h1) = spawned.output.recv().await.unwrap();
    let (_, h2) = spawned.output.recv().await.unwrap();
    let (_, h1_again) = spawned.output.recv().await.unwrap();

    // The repeated fetch reuses the live handle while the payloads differ
    assert!(h1.is_same(&h1_again));
    assert!(!h1.is_same(&h2));
    assert_eq!(h1.wait().await.unwrap().as_ref(), b"first volume payload");
    assert_eq!(h2.wait().await.unwrap().as_ref(), b"second volume payload");

    spawned.requests.send(BlockRequest::Evict(v1)).await.unwrap();
    spawned.requests.send(BlockRequest::Evict(v2)).await.unwrap();
    drop(spawned.requests);

    let summary = spawned.task.await.unwrap().unwrap();
    assert_eq!(summary.requests_processed, 5);
    assert_eq!(summary.volumes_fetched, 2);
    assert_eq!(summary.volumes_evicted, 2);
    assert!(summary.leftover_volumes.is_empty());
    assert!(failures.is_empty().await);

    fixture.cleanup().await;
}

#[tokio::test]
async fn unregistered_volume_faults_the_restore() {
    let fixture = Fixture::new().await;
    let v1 = fixture.add_volume("vault-b0001.zvol", b"data").await;

    let failures = FailureLog::new();
    let downloader = VolumeDownloader::new(
        fixture.index.clone(),
        fixture.backend.clone(),
        failures.clone(),
    );
    let mut spawned = downloader.spawn();

    let missing = VolumeId::new(v1.as_i64() + 100);
    spawned.requests.send(BlockRequest::Fetch(v1)).await.unwrap();
    spawned
        .requests
        .send(BlockRequest::Fetch(missing))
        .await
        .unwrap();

    let (_, handle) = spawned.output.recv().await.unwrap();
    assert!(handle.wait().await.is_ok());

    let result = spawned.task.await.unwrap();
    assert!(matches!(
        result,
        Err(RestoreError::MetadataLookup { volume, .. }) if volume == missing
    ));
    assert_eq!(failures.snapshot().await, vec![missing]);

    fixture.cleanup().await;
}

#[tokio::test]
async fn eviction_surfaces_corrupt_volume() {
    let fixture = Fixture::new().await;

    // Register with a deliberately wrong hash so the read fails verification
    tokio::fs::write(fixture.root.join("corrupt.zvol"), b"tampered")
        .await
        .unwrap();
    let bad = fixture
        .index
        .register(&VolumeInfo::new("corrupt.zvol", 8, "ffffffff"))
        .await
        .unwrap();

    let downloader = VolumeDownloader::new(
        fixture.index.clone(),
        fixture.backend.clone(),
        FailureLog::new(),
    );
    let mut spawned = downloader.spawn();

    spawned.requests.send(BlockRequest::Fetch(bad)).await.unwrap();
    let (_, handle) = spawned.output.recv().await.unwrap();
    assert!(handle.wait().await.is_err());

    // Evicting the failed download faults the loop with the transfer error
    spawned.requests.send(BlockRequest::Evict(bad)).await.unwrap();
    let result = spawned.task.await.unwrap();
    assert!(matches!(result, Err(RestoreError::Backend(_))));

    fixture.cleanup().await;
}

#[tokio::test]
async fn direct_backend_fetch_round_trip() {
    let fixture = Fixture::new().await;
    let id = fixture.add_volume("single.zvol", b"abc123").await;

    let info = fixture.index.volume_info(id).await.unwrap().unwrap();
    let handle = fixture.backend.start_fetch(&info).await.unwrap();

    assert_eq!(handle.wait().await.unwrap().as_ref(), b"abc123");
    handle.release().await.unwrap();

    fixture.cleanup().await;
}
