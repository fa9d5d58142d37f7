//! # Volume Downloader
//!
//! Turns block-level restore requests into deduplicated, cached volume
//! downloads.
//!
//! ## Overview
//!
//! The `VolumeDownloader` is one stage of the restore pipeline. It reads an
//! ordered stream of [`BlockRequest`]s, consults and maintains the
//! [`VolumeCache`], initiates asynchronous fetches through the
//! [`StorageBackend`], and forwards live download handles downstream. It
//! guarantees:
//! - At most one in-flight download per volume between evictions
//! - Handles handed out without blocking on transfer completion
//! - Eviction waits for the transfer to settle before releasing resources
//! - Unreachable volumes recorded in the shared [`FailureLog`]
//!
//! ## Workflow
//!
//! 1. Receive one request (suspends until available or channel closed)
//! 2. `Evict(v)`: remove from cache; if present, wait then release. No output
//! 3. `Fetch(v)`: cache hit reuses the handle; miss resolves metadata,
//!    starts a backend fetch, caches the new handle
//! 4. Emit `(request, handle)` downstream (suspends under backpressure)
//!
//! Input closure retires the loop gracefully. Any failure tears it down
//! immediately and propagates to the pipeline supervisor; this stage never
//! retries, retry policy belongs to the backend.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_restore::{BlockRequest, FailureLog, VolumeDownloader};
//! use std::sync::Arc;
//!
//! let downloader = VolumeDownloader::new(index, backend, FailureLog::new());
//! let mut spawned = downloader.spawn();
//!
//! spawned.requests.send(BlockRequest::Fetch(volume)).await?;
//! let (request, handle) = spawned.output.recv().await.unwrap();
//! let payload = handle.wait().await?;
//!
//! spawned.requests.send(BlockRequest::Evict(volume)).await?;
//! drop(spawned.requests);
//! let summary = spawned.task.await??;
//! ```

use crate::{
    cache::VolumeCache, config::RestoreConfig, failures::FailureLog, request::BlockRequest,
    timing::StageTimings, RestoreError, Result,
};
use backend_traits::{DownloadHandle, StorageBackend, VolumeId, VolumeIndex};
use core_runtime::events::{EngineEvent, EventBus, RestoreEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for one restore operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(Uuid);

impl OperationId {
    /// Create a new random operation ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an operation ID from a string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self> {
        Ok(Self(Uuid::parse_str(s).map_err(|e| {
            RestoreError::Config(format!("Invalid operation id: {}", e))
        })?))
    }
}

impl Default for OperationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for OperationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<OperationId> for Uuid {
    fn from(id: OperationId) -> Self {
        id.0
    }
}

// ============================================================================
// Retirement Summary
// ============================================================================

/// What the downloader did over its lifetime, returned at retirement.
#[derive(Debug, Clone)]
pub struct RetireSummary {
    /// The operation this downloader served.
    pub operation: OperationId,

    /// Total requests received, evictions included.
    pub requests_processed: u64,

    /// Backend fetches actually initiated (cache misses).
    pub volumes_fetched: u64,

    /// Evictions that found and released a cached handle.
    pub volumes_evicted: u64,

    /// Volumes still cached at retirement. Non-empty means some handle was
    /// never evicted; ownership stays with whoever still holds references.
    pub leftover_volumes: Vec<VolumeId>,

    /// Accumulated phase timings when profiling was enabled.
    pub timings: Option<StageTimings>,
}

// ============================================================================
// Volume Downloader
// ============================================================================

/// Coordinator for volume downloads during a restore operation.
pub struct VolumeDownloader {
    /// Operation this downloader belongs to; tags logs and events.
    operation: OperationId,

    /// Channel capacities and profiling switch.
    config: RestoreConfig,

    /// Metadata lookup translating a volume id into (name, size, hash).
    index: Arc<dyn VolumeIndex>,

    /// Backend that performs the actual byte transfer.
    backend: Arc<dyn StorageBackend>,

    /// Shared collector of volumes that could not be retrieved.
    failures: FailureLog,

    /// Optional event bus for progress and failure events.
    event_bus: Option<EventBus>,
}

impl VolumeDownloader {
    /// Create a new downloader.
    ///
    /// # Arguments
    ///
    /// * `index` - Metadata lookup for volume name, size and hash
    /// * `backend` - Storage backend initiating asynchronous fetches
    /// * `failures` - Shared failure log, also written by sibling stages
    pub fn new(
        index: Arc<dyn VolumeIndex>,
        backend: Arc<dyn StorageBackend>,
        failures: FailureLog,
    ) -> Self {
        Self {
            operation: OperationId::new(),
            config: RestoreConfig::default(),
            index,
            backend,
            failures,
            event_bus: None,
        }
    }

    /// Replaces the default configuration.
    pub fn with_config(mut self, config: RestoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches an event bus for progress and failure events.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Tags this downloader with an existing operation id instead of a
    /// freshly generated one.
    pub fn with_operation_id(mut self, operation: OperationId) -> Self {
        self.operation = operation;
        self
    }

    /// The operation id this downloader is tagged with.
    pub fn operation_id(&self) -> OperationId {
        self.operation
    }

    /// The shared failure log.
    pub fn failures(&self) -> &FailureLog {
        &self.failures
    }

    /// Runs the downloader until the request channel closes or a failure
    /// tears it down.
    ///
    /// Requests are processed strictly in arrival order and outputs preserve
    /// that order; the loop has no internal parallelism. On graceful
    /// retirement the summary is returned; leftover cached volumes are
    /// logged as a warning but are not a fault. Any error is logged and
    /// re-raised so the pipeline supervisor can fail the whole operation.
    #[instrument(skip(self, requests, output), fields(operation = %self.operation))]
    pub async fn run(
        self,
        requests: mpsc::Receiver<BlockRequest>,
        output: mpsc::Sender<(BlockRequest, DownloadHandle)>,
    ) -> Result<RetireSummary> {
        match self.run_loop(requests, output).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!(error = %e, "Volume downloader faulted");
                Err(e)
            }
        }
    }

    /// Creates the channels from the configured capacities and runs the
    /// downloader on a background task.
    pub fn spawn(self) -> SpawnedDownloader {
        // A zero capacity would panic channel creation; `run` still rejects
        // the configuration itself, so the error surfaces through the task.
        let (request_tx, request_rx) = mpsc::channel(self.config.request_capacity.max(1));
        let (output_tx, output_rx) = mpsc::channel(self.config.output_capacity.max(1));
        let task = tokio::spawn(self.run(request_rx, output_tx));

        SpawnedDownloader {
            requests: request_tx,
            output: output_rx,
            task,
        }
    }

    async fn run_loop(
        &self,
        mut requests: mpsc::Receiver<BlockRequest>,
        output: mpsc::Sender<(BlockRequest, DownloadHandle)>,
    ) -> Result<RetireSummary> {
        self.config.validate()?;

        let mut cache = VolumeCache::new();
        let mut timings = self.config.profile_stages.then(StageTimings::new);
        let mut requests_processed = 0u64;
        let mut volumes_fetched = 0u64;
        let mut volumes_evicted = 0u64;

        info!("Volume downloader running");

        loop {
            let started = Instant::now();
            let Some(request) = requests.recv().await else {
                break;
            };
            if let Some(t) = timings.as_mut() {
                t.record_receive(started.elapsed());
            }
            requests_processed += 1;

            match request {
                BlockRequest::Evict(volume) => {
                    let started = Instant::now();
                    let released = self.evict(&mut cache, volume).await;
                    if let Some(t) = timings.as_mut() {
                        t.record_cache_evict(started.elapsed());
                    }
                    if released? {
                        volumes_evicted += 1;
                    }
                }
                BlockRequest::Fetch(volume) => {
                    let started = Instant::now();
                    let resolved = self.fetch_or_reuse(&mut cache, volume).await;
                    if let Some(t) = timings.as_mut() {
                        t.record_cache_insert(started.elapsed());
                    }
                    let (handle, initiated) = resolved?;
                    if initiated {
                        volumes_fetched += 1;
                    }

                    let started = Instant::now();
                    if output.send((request, handle)).await.is_err() {
                        return Err(RestoreError::OutputClosed);
                    }
                    if let Some(t) = timings.as_mut() {
                        t.record_send(started.elapsed());
                    }
                }
            }
        }

        // Graceful retirement: input channel closed.
        let leftover_volumes = cache.volume_ids();
        if leftover_volumes.is_empty() {
            debug!(
                requests = requests_processed,
                "Volume downloader retiring; cache empty"
            );
        } else {
            // Every cached handle should have been evicted before shutdown.
            // Ownership is presumed transferred to whoever still holds
            // references; nothing is force-released here.
            warn!(
                leftover = leftover_volumes.len(),
                volumes = ?leftover_volumes,
                "Volume downloader retiring with cached volumes; handles were never evicted"
            );
        }

        self.emit(RestoreEvent::Retired {
            operation: self.operation.to_string(),
            requests_processed,
            leftover_volumes: leftover_volumes.len() as u64,
        });

        if let Some(t) = &timings {
            t.log_summary();
        }

        Ok(RetireSummary {
            operation: self.operation,
            requests_processed,
            volumes_fetched,
            volumes_evicted,
            leftover_volumes,
            timings,
        })
    }

    /// Handles one eviction request. Returns whether a handle was released.
    async fn evict(&self, cache: &mut VolumeCache, volume: VolumeId) -> Result<bool> {
        let Some(handle) = cache.remove_and_take(volume) else {
            debug!(volume = volume.as_i64(), "Eviction for uncached volume ignored");
            return Ok(false);
        };

        // Wait-then-release. Releasing before the transfer settles would
        // discard data a concurrent reader still needs or leak backend
        // resources allocated before completion.
        match handle.wait().await {
            Ok(_payload) => {
                handle.release().await?;
            }
            Err(e) => {
                if let Err(release_err) = handle.release().await {
                    debug!(
                        volume = volume.as_i64(),
                        error = %release_err,
                        "Release after failed transfer also failed"
                    );
                }
                error!(
                    volume = volume.as_i64(),
                    name = handle.name(),
                    error = %e,
                    "Cached transfer failed; surfaced on eviction"
                );
                return Err(e.into());
            }
        }

        debug!(volume = volume.as_i64(), name = handle.name(), "Volume evicted");
        self.emit(RestoreEvent::VolumeEvicted {
            operation: self.operation.to_string(),
            volume_id: volume.as_i64(),
        });
        Ok(true)
    }

    /// Resolves a fetch request to a handle. Returns the handle and whether
    /// a new backend fetch was initiated.
    async fn fetch_or_reuse(
        &self,
        cache: &mut VolumeCache,
        volume: VolumeId,
    ) -> Result<(DownloadHandle, bool)> {
        if let Some(handle) = cache.lookup(volume) {
            debug!(
                volume = volume.as_i64(),
                name = handle.name(),
                "Cache hit; reusing active download"
            );
            return Ok((handle, false));
        }

        let info = match self.index.volume_info(volume).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                return Err(self
                    .volume_failed(volume, "volume not found in index".to_string(), true)
                    .await);
            }
            Err(e) => {
                return Err(self.volume_failed(volume, e.to_string(), true).await);
            }
        };

        let handle = match self.backend.start_fetch(&info).await {
            Ok(handle) => handle,
            Err(e) => {
                return Err(self.volume_failed(volume, e.to_string(), false).await);
            }
        };

        debug!(
            volume = volume.as_i64(),
            name = %info.name,
            size = info.size,
            "Download started"
        );
        self.emit(RestoreEvent::DownloadStarted {
            operation: self.operation.to_string(),
            volume_id: volume.as_i64(),
            name: info.name,
            size: info.size,
        });

        cache.insert(volume, handle.clone());
        Ok((handle, true))
    }

    /// Records an unreachable volume and builds the fatal error for it.
    async fn volume_failed(
        &self,
        volume: VolumeId,
        message: String,
        metadata: bool,
    ) -> RestoreError {
        self.failures.report(volume).await;
        error!(
            volume = volume.as_i64(),
            message = %message,
            "Volume could not be retrieved"
        );
        self.emit(RestoreEvent::VolumeFailed {
            operation: self.operation.to_string(),
            volume_id: volume.as_i64(),
            message: message.clone(),
        });

        if metadata {
            RestoreError::MetadataLookup { volume, message }
        } else {
            RestoreError::FetchInitiation { volume, message }
        }
    }

    fn emit(&self, event: RestoreEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(EngineEvent::Restore(event)).ok();
        }
    }
}

/// Channel endpoints and task handle for a downloader running in the
/// background.
pub struct SpawnedDownloader {
    /// Send requests here; drop it to retire the downloader gracefully.
    pub requests: mpsc::Sender<BlockRequest>,

    /// Receives one `(request, handle)` pair per fetch request, in order.
    pub output: mpsc::Receiver<(BlockRequest, DownloadHandle)>,

    /// Resolves with the retirement summary, or the fault that tore the
    /// loop down.
    pub task: JoinHandle<Result<RetireSummary>>,
}
