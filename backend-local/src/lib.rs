//! # Local Backend Module
//!
//! Filesystem storage backend and SQLite volume index for the restore engine.
//!
//! ## Overview
//!
//! Serves backup volumes from a local directory tree, the layout produced by
//! a file-target backup. Used directly for restores from locally mounted
//! storage and as the reference backend in tests:
//! - **Local Storage Backend** (`storage`): Asynchronous file reads with SHA-256 verification
//! - **SQLite Volume Index** (`index`): Volume catalogue resolving ids to (name, size, hash)

pub mod index;
pub mod storage;

pub use index::SqliteVolumeIndex;
pub use storage::LocalStorageBackend;
