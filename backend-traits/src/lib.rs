//! # Backend Traits
//!
//! Contracts between the restore engine and its storage-side collaborators.
//!
//! ## Overview
//!
//! This crate defines the boundary the restore pipeline sees when it talks
//! to storage: who knows what a volume is ([`VolumeIndex`]), who moves its
//! bytes ([`StorageBackend`]), and what the in-flight result looks like
//! ([`DownloadHandle`]). Concrete implementations live in their own crates
//! (e.g. `backend-local` for directory-backed deployments) so the engine can
//! be exercised against fakes in tests.
//!
//! ## Traits
//!
//! - [`VolumeIndex`](volume::VolumeIndex) - Volume id → remote name/size/hash
//! - [`StorageBackend`](storage::StorageBackend) - Initiates asynchronous volume fetches
//!
//! ## Error Handling
//!
//! All traits use [`BackendError`](error::BackendError). Implementations
//! convert their native errors (sqlx, io, transport) into it and keep the
//! messages actionable.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`; handles are `Clone` and safe to wait on
//! from any number of tasks.

pub mod error;
pub mod handle;
pub mod storage;
pub mod volume;

pub use error::{BackendError, Result};

// Re-export commonly used types
pub use handle::{DownloadHandle, HandlePhase};
pub use storage::StorageBackend;
pub use volume::{VolumeId, VolumeIndex, VolumeInfo};
