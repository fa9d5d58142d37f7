//! # Local Storage Backend
//!
//! A [`StorageBackend`] that serves volumes out of a directory tree.
//!
//! ## Overview
//!
//! Each `start_fetch` spawns a background read of the named file under the
//! backend's root directory and returns a pending handle immediately, so the
//! downloader loop never blocks on transfer completion. The backend owns
//! integrity checking: unless disabled, the file's SHA-256 digest is compared
//! against the expected hash and a mismatch fails the handle.
//!
//! Shutting the backend down cancels in-flight reads; their handles settle
//! as failed so parked waiters are not left suspended forever.

use backend_traits::{BackendError, DownloadHandle, StorageBackend, VolumeInfo};
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Storage backend reading volumes from the local filesystem.
pub struct LocalStorageBackend {
    /// Directory all volume names resolve under.
    root: PathBuf,

    /// Cancels in-flight reads on shutdown.
    shutdown: CancellationToken,

    /// Compare file digests against the expected volume hash.
    verify_hashes: bool,
}

impl LocalStorageBackend {
    /// Creates a backend rooted at `root`. Hash verification is on.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            shutdown: CancellationToken::new(),
            verify_hashes: true,
        }
    }

    /// Enables or disables digest verification.
    pub fn with_hash_verification(mut self, verify: bool) -> Self {
        self.verify_hashes = verify;
        self
    }

    /// The directory volumes are read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rejects new fetches and cancels in-flight reads. Their handles
    /// settle as failed.
    pub fn shutdown(&self) {
        debug!(root = %self.root.display(), "Local storage backend shutting down");
        self.shutdown.cancel();
    }

    /// Resolves a volume name to a path under the root.
    ///
    /// Absolute names and names containing parent components are rejected;
    /// a volume name must never address files outside the root.
    fn volume_path(&self, name: &str) -> backend_traits::Result<PathBuf> {
        if name.is_empty() {
            return Err(BackendError::FetchRejected(
                "empty volume name".to_string(),
            ));
        }

        let relative = Path::new(name);
        let escapes = relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)));
        if escapes {
            return Err(BackendError::FetchRejected(format!(
                "volume name escapes storage root: {}",
                name
            )));
        }

        Ok(self.root.join(relative))
    }

    async fn read_volume(
        path: PathBuf,
        expected: VolumeInfo,
        verify_hashes: bool,
    ) -> backend_traits::Result<Bytes> {
        let data = tokio::fs::read(&path).await?;

        if expected.size >= 0 && data.len() as i64 != expected.size {
            return Err(BackendError::DownloadFailed(format!(
                "size mismatch for {}: expected {} bytes, read {}",
                expected.name,
                expected.size,
                data.len()
            )));
        }

        if verify_hashes && !expected.hash.is_empty() {
            let mut hasher = Sha256::new();
            hasher.update(&data);
            let digest = format!("{:x}", hasher.finalize());
            if !digest.eq_ignore_ascii_case(&expected.hash) {
                return Err(BackendError::DownloadFailed(format!(
                    "hash mismatch for {}: expected {}, computed {}",
                    expected.name, expected.hash, digest
                )));
            }
        }

        Ok(Bytes::from(data))
    }
}

#[async_trait::async_trait]
impl StorageBackend for LocalStorageBackend {
    async fn start_fetch(&self, info: &VolumeInfo) -> backend_traits::Result<DownloadHandle> {
        if self.shutdown.is_cancelled() {
            return Err(BackendError::FetchRejected(
                "backend is shut down".to_string(),
            ));
        }

        let path = self.volume_path(&info.name)?;
        let handle = DownloadHandle::pending(info.name.as_str());

        let task_handle = handle.clone();
        let expected = info.clone();
        let verify_hashes = self.verify_hashes;
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    warn!(name = task_handle.name(), "Read cancelled by backend shutdown");
                    task_handle.fail("backend shut down").await;
                }
                result = Self::read_volume(path, expected, verify_hashes) => match result {
                    Ok(payload) => {
                        debug!(
                            name = task_handle.name(),
                            bytes = payload.len(),
                            "Volume read complete"
                        );
                        task_handle.complete(payload).await;
                    }
                    Err(e) => {
                        warn!(name = task_handle.name(), error = %e, "Volume read failed");
                        task_handle.fail(e.to_string()).await;
                    }
                },
            }
        });

        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend_traits::HandlePhase;
    use std::path::PathBuf;
    use uuid::Uuid;

    async fn temp_root() -> PathBuf {
        let root = std::env::temp_dir().join(format!("bv-storage-test-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&root).await.unwrap();
        root
    }

    fn sha256_hex(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    #[tokio::test]
    async fn test_fetch_reads_and_verifies() {
        let root = temp_root().await;
        let payload = b"volume contents".to_vec();
        tokio::fs::write(root.join("vault-b0001.zvol"), &payload)
            .await
            .unwrap();

        let backend = LocalStorageBackend::new(&root);
        let info = VolumeInfo::new("vault-b0001.zvol", payload.len() as i64, sha256_hex(&payload));

        let handle = backend.start_fetch(&info).await.unwrap();
        assert_eq!(handle.wait().await.unwrap(), Bytes::from(payload));

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_hash_mismatch_fails_handle() {
        let root = temp_root().await;
        tokio::fs::write(root.join("bad.zvol"), b"actual bytes")
            .await
            .unwrap();

        let backend = LocalStorageBackend::new(&root);
        let info = VolumeInfo::new("bad.zvol", 12, "0000000000000000");

        let handle = backend.start_fetch(&info).await.unwrap();
        let err = handle.wait().await.unwrap_err();
        assert!(matches!(err, BackendError::DownloadFailed(_)));
        assert!(err.to_string().contains("hash mismatch"));

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_verification_can_be_disabled() {
        let root = temp_root().await;
        tokio::fs::write(root.join("loose.zvol"), b"whatever")
            .await
            .unwrap();

        let backend = LocalStorageBackend::new(&root).with_hash_verification(false);
        let info = VolumeInfo::new("loose.zvol", 8, "not-a-real-hash");

        let handle = backend.start_fetch(&info).await.unwrap();
        assert_eq!(handle.wait().await.unwrap(), Bytes::from_static(b"whatever"));

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_size_mismatch_fails_handle() {
        let root = temp_root().await;
        tokio::fs::write(root.join("short.zvol"), b"abc").await.unwrap();

        let backend = LocalStorageBackend::new(&root).with_hash_verification(false);
        let info = VolumeInfo::new("short.zvol", 9999, "");

        let handle = backend.start_fetch(&info).await.unwrap();
        let err = handle.wait().await.unwrap_err();
        assert!(err.to_string().contains("size mismatch"));

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_fails_handle() {
        let root = temp_root().await;
        let backend = LocalStorageBackend::new(&root);
        let info = VolumeInfo::new("absent.zvol", 10, "cafe");

        let handle = backend.start_fetch(&info).await.unwrap();
        assert!(handle.wait().await.is_err());
        assert_eq!(handle.phase().await, HandlePhase::Failed);

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_escaping_names_rejected() {
        let root = temp_root().await;
        let backend = LocalStorageBackend::new(&root);

        for name in ["../secrets.txt", "/etc/passwd", ""] {
            let info = VolumeInfo::new(name, 1, "aa");
            let err = backend.start_fetch(&info).await.unwrap_err();
            assert!(matches!(err, BackendError::FetchRejected(_)));
        }

        // Nested relative names are fine
        tokio::fs::create_dir_all(root.join("set1")).await.unwrap();
        tokio::fs::write(root.join("set1/v.zvol"), b"ok").await.unwrap();
        let info = VolumeInfo::new("set1/v.zvol", 2, "");
        let handle = backend.start_fetch(&info).await.unwrap();
        assert!(handle.wait().await.is_ok());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_fetches() {
        let root = temp_root().await;
        let backend = LocalStorageBackend::new(&root);
        backend.shutdown();

        let info = VolumeInfo::new("any.zvol", 1, "aa");
        let err = backend.start_fetch(&info).await.unwrap_err();
        assert!(matches!(err, BackendError::FetchRejected(_)));

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
