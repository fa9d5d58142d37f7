//! # Restore Pipeline Module
//!
//! Coordinates volume downloads for a backup-restore operation.
//!
//! ## Overview
//!
//! This module implements the download stage of the restore pipeline:
//! - Turning block-level requests into at most one in-flight download per volume
//! - Handing live download handles downstream without blocking on completion
//! - Releasing volume resources on explicit eviction requests
//! - Recording unreachable volumes for the final restore report
//!
//! ## Components
//!
//! - **Block Requests** (`request`): The fetch/evict instruction stream consumed by the downloader
//! - **Volume Cache** (`cache`): Single-owner map enforcing one active download per volume
//! - **Failure Log** (`failures`): Shared append-only set of volumes that could not be retrieved
//! - **Volume Downloader** (`coordinator`): The loop that reads requests, maintains the cache and forwards handles
//! - **Stage Timings** (`timing`): Optional cumulative per-phase profiling

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod failures;
pub mod request;
pub mod timing;

pub use cache::VolumeCache;
pub use config::RestoreConfig;
pub use coordinator::{OperationId, RetireSummary, SpawnedDownloader, VolumeDownloader};
pub use error::{RestoreError, Result};
pub use failures::FailureLog;
pub use request::BlockRequest;
pub use timing::StageTimings;
