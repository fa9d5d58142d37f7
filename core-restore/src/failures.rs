//! # Failure Log
//!
//! Shared collector of volumes that could not be retrieved.
//!
//! ## Overview
//!
//! Several pipeline stages can discover that a volume is unreachable
//! (metadata missing, backend refused the fetch). They all report into one
//! `FailureLog`, which the operation owner reads after the pipeline winds
//! down to tell the user exactly which volumes were not restored. The log is
//! append-only for the lifetime of an operation and survives a failing
//! downloader loop: the loop faults, the log keeps its contents.

use backend_traits::VolumeId;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Concurrency-safe, append-only set of failed volume ids.
///
/// Cloning is cheap and every clone reports into the same set.
#[derive(Debug, Clone, Default)]
pub struct FailureLog {
    failed: Arc<Mutex<HashSet<VolumeId>>>,
}

impl FailureLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `volume` could not be retrieved.
    ///
    /// Returns `true` if the volume was not already recorded. Reporting the
    /// same volume twice keeps a single entry.
    pub async fn report(&self, volume: VolumeId) -> bool {
        self.failed.lock().await.insert(volume)
    }

    /// Whether `volume` has been recorded as failed.
    pub async fn contains(&self, volume: VolumeId) -> bool {
        self.failed.lock().await.contains(&volume)
    }

    /// Number of distinct failed volumes.
    pub async fn len(&self) -> usize {
        self.failed.lock().await.len()
    }

    /// Whether no failures have been recorded.
    pub async fn is_empty(&self) -> bool {
        self.failed.lock().await.is_empty()
    }

    /// All failed volume ids, sorted for stable reporting.
    pub async fn snapshot(&self) -> Vec<VolumeId> {
        let mut ids: Vec<VolumeId> = self.failed.lock().await.iter().copied().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_report_and_snapshot() {
        let log = FailureLog::new();
        assert!(log.is_empty().await);

        assert!(log.report(VolumeId::new(4)).await);
        assert!(log.report(VolumeId::new(2)).await);

        assert_eq!(log.len().await, 2);
        assert!(log.contains(VolumeId::new(4)).await);
        assert_eq!(
            log.snapshot().await,
            vec![VolumeId::new(2), VolumeId::new(4)]
        );
    }

    #[tokio::test]
    async fn test_duplicate_report_kept_once() {
        let log = FailureLog::new();
        assert!(log.report(VolumeId::new(7)).await);
        assert!(!log.report(VolumeId::new(7)).await);
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_the_set() {
        let log = FailureLog::new();
        let other = log.clone();

        log.report(VolumeId::new(1)).await;
        other.report(VolumeId::new(2)).await;

        assert_eq!(log.len().await, 2);
        assert_eq!(other.len().await, 2);
    }

    #[tokio::test]
    async fn test_concurrent_reporters_lose_nothing() {
        let log = FailureLog::new();
        let mut handles = Vec::new();

        for i in 0..20 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                log.report(VolumeId::new(i)).await;
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(log.len().await, 20);
    }
}
