//! # Volume Cache
//!
//! Maps volume ids to their in-flight or completed download handles.
//!
//! ## Overview
//!
//! The cache enforces at-most-one-active-download-per-volume: a key is
//! present exactly while a download has been initiated and not yet evicted.
//! It is deliberately a plain `HashMap` with no interior locking. Only the
//! downloader loop touches the map (single writer, single reader), so the
//! check-then-act sequence around `lookup`/`insert` is race-free by
//! construction. Concurrency lives inside the handles instead: a handle
//! cloned out of the cache keeps progressing independently of the map entry.

use backend_traits::{DownloadHandle, VolumeId};
use std::collections::HashMap;
use tracing::warn;

/// Single-owner mapping from volume id to download handle.
#[derive(Debug, Default)]
pub struct VolumeCache {
    entries: HashMap<VolumeId, DownloadHandle>,
}

impl VolumeCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the cached handle for `volume`, if a download is active.
    ///
    /// No side effects; the returned handle shares state with the cached one.
    pub fn lookup(&self, volume: VolumeId) -> Option<DownloadHandle> {
        self.entries.get(&volume).cloned()
    }

    /// Stores a freshly initiated handle.
    ///
    /// The caller owns the absence check via `lookup`. A replaced entry
    /// would mean a duplicate in-flight download for the same volume, so an
    /// overwrite is logged loudly before the old handle is dropped.
    pub fn insert(&mut self, volume: VolumeId, handle: DownloadHandle) {
        if let Some(previous) = self.entries.insert(volume, handle) {
            warn!(
                volume = volume.as_i64(),
                name = previous.name(),
                "Replaced an existing cache entry; duplicate download initiated"
            );
        }
    }

    /// Removes and returns the handle for `volume`.
    ///
    /// Returns `None` when the volume is absent; evicting an unknown or
    /// already-evicted volume is a no-op, not an error.
    pub fn remove_and_take(&mut self, volume: VolumeId) -> Option<DownloadHandle> {
        self.entries.remove(&volume)
    }

    /// Number of volumes currently cached.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no volumes.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The ids of all cached volumes, sorted for stable reporting.
    pub fn volume_ids(&self) -> Vec<VolumeId> {
        let mut ids: Vec<VolumeId> = self.entries.keys().copied().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn ready_handle(name: &str) -> DownloadHandle {
        DownloadHandle::ready(name, Bytes::from_static(b"payload"))
    }

    #[test]
    fn test_lookup_miss() {
        let cache = VolumeCache::new();
        assert!(cache.lookup(VolumeId::new(1)).is_none());
    }

    #[test]
    fn test_insert_then_lookup_shares_state() {
        let mut cache = VolumeCache::new();
        let handle = ready_handle("vault-b0001.zvol");
        cache.insert(VolumeId::new(1), handle.clone());

        let found = cache.lookup(VolumeId::new(1)).unwrap();
        assert!(found.is_same(&handle));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_remove_and_take() {
        let mut cache = VolumeCache::new();
        let handle = ready_handle("vault-b0002.zvol");
        cache.insert(VolumeId::new(2), handle.clone());

        let taken = cache.remove_and_take(VolumeId::new(2)).unwrap();
        assert!(taken.is_same(&handle));
        assert!(cache.is_empty());

        // Second eviction is a no-op
        assert!(cache.remove_and_take(VolumeId::new(2)).is_none());
    }

    #[test]
    fn test_volume_ids_sorted() {
        let mut cache = VolumeCache::new();
        cache.insert(VolumeId::new(9), ready_handle("c"));
        cache.insert(VolumeId::new(3), ready_handle("a"));
        cache.insert(VolumeId::new(5), ready_handle("b"));

        assert_eq!(
            cache.volume_ids(),
            vec![VolumeId::new(3), VolumeId::new(5), VolumeId::new(9)]
        );
    }
}
