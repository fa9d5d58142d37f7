//! # Restore Pipeline Demo
//!
//! Wires the volume downloader to the local backend and a SQLite volume
//! index, then walks a small restore: fetch, reuse, evict.
//!
//! Run with: `cargo run --example restore_demo --package backend-local`

use anyhow::Context;
use backend_local::{LocalStorageBackend, SqliteVolumeIndex};
use backend_traits::VolumeInfo;
use core_restore::{BlockRequest, FailureLog, RestoreConfig, VolumeDownloader};
use core_runtime::events::{EngineEvent, EventBus, RecvError};
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = LoggingConfig::default().with_format(LogFormat::Compact);
    init_logging(&config).context("failed to initialize logging")?;

    println!("🗄️  BlockVault Restore Demo\n");

    // ------------------------------------------------------------------
    // Stage a small backup set in a temporary directory
    // ------------------------------------------------------------------
    let root = std::env::temp_dir().join(format!("bv-demo-{}", Uuid::new_v4()));
    tokio::fs::create_dir_all(&root).await?;
    println!("📁 Staging volumes under {}", root.display());

    let pool = SqlitePool::connect(":memory:").await?;
    let index = SqliteVolumeIndex::new(pool);
    index.initialize().await?;

    let mut volume_ids = Vec::new();
    for (name, payload) in [
        ("vault-b0001.zvol", &b"block data for files 1 through 40"[..]),
        ("vault-b0002.zvol", &b"block data for files 41 through 80"[..]),
    ] {
        tokio::fs::write(root.join(name), payload).await?;

        let mut hasher = Sha256::new();
        hasher.update(payload);
        let hash = format!("{:x}", hasher.finalize());

        let id = index
            .register(&VolumeInfo::new(name, payload.len() as i64, hash))
            .await?;
        println!("   Registered {} as volume {}", name, id);
        volume_ids.push(id);
    }

    // ------------------------------------------------------------------
    // Watch restore events on the side
    // ------------------------------------------------------------------
    let event_bus = EventBus::new(100);
    let mut events = event_bus.subscribe();
    let watcher = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("📣 {}: {:?}", event.description(), event.severity()),
                Err(RecvError::Lagged(n)) => eprintln!("missed {} events", n),
                Err(RecvError::Closed) => break,
            }
        }
    });

    // ------------------------------------------------------------------
    // Run the downloader
    // ------------------------------------------------------------------
    let backend = Arc::new(LocalStorageBackend::new(&root));
    let failures = FailureLog::new();
    let downloader = VolumeDownloader::new(Arc::new(index), backend.clone(), failures.clone())
        .with_config(RestoreConfig::default().with_profiling(true))
        .with_event_bus(event_bus.clone());

    println!("\n⬇️  Restoring: fetch v1, fetch v2, reuse v1, then evict both");
    let mut spawned = downloader.spawn();

    let (v1, v2) = (volume_ids[0], volume_ids[1]);
    for request in [
        BlockRequest::Fetch(v1),
        BlockRequest::Fetch(v2),
        BlockRequest::Fetch(v1),
    ] {
        spawned.requests.send(request).await?;
    }

    for _ in 0..3 {
        let (request, handle) = spawned
            .output
            .recv()
            .await
            .context("downloader closed its output early")?;
        let payload = handle.wait().await?;
        println!(
            "   {:?} -> {} ({} bytes)",
            request,
            handle.name(),
            payload.len()
        );
    }

    spawned.requests.send(BlockRequest::Evict(v1)).await?;
    spawned.requests.send(BlockRequest::Evict(v2)).await?;
    drop(spawned.requests);

    let summary = spawned.task.await??;

    // ------------------------------------------------------------------
    // Report
    // ------------------------------------------------------------------
    println!("\n✅ Restore finished");
    println!("   Operation:          {}", summary.operation);
    println!("   Requests processed: {}", summary.requests_processed);
    println!("   Volumes fetched:    {}", summary.volumes_fetched);
    println!("   Volumes evicted:    {}", summary.volumes_evicted);
    println!("   Leftover volumes:   {:?}", summary.leftover_volumes);
    if let Some(timings) = summary.timings {
        println!("   Time receiving:     {:?}", timings.receive);
        println!("   Time fetching:      {:?}", timings.cache_insert);
        println!("   Time evicting:      {:?}", timings.cache_evict);
        println!("   Time sending:       {:?}", timings.send);
    }
    if !failures.is_empty().await {
        println!("   Failed volumes:     {:?}", failures.snapshot().await);
    }

    backend.shutdown();
    drop(event_bus);
    watcher.await.ok();

    tokio::fs::remove_dir_all(&root).await.ok();
    Ok(())
}
