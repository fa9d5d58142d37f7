//! Storage backend abstraction.
//!
//! The backend owns the actual byte transfer: transport, retries, and
//! integrity verification all live behind this trait. The coordinator only
//! ever asks it to start a fetch and gets a handle back immediately.

use async_trait::async_trait;

use crate::error::Result;
use crate::handle::DownloadHandle;
use crate::volume::VolumeInfo;

/// Asynchronous volume fetches against remote storage.
///
/// `start_fetch` must return without waiting for the transfer: the returned
/// handle is typically still pending and is settled by the backend from its
/// own task. An `Err` from `start_fetch` means the transfer could not even
/// be initiated (bad name, backend shut down, ...). A transfer that starts
/// and later fails is reported through the handle instead.
///
/// # Example
///
/// ```ignore
/// use backend_traits::{StorageBackend, VolumeInfo};
///
/// async fn fetch_one(backend: &dyn StorageBackend, info: &VolumeInfo) -> backend_traits::Result<()> {
///     let handle = backend.start_fetch(info).await?;
///     let payload = handle.wait().await?;
///     // hand payload to the decryptor...
///     handle.release().await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Initiate the fetch of one remote volume.
    async fn start_fetch(&self, info: &VolumeInfo) -> Result<DownloadHandle>;
}
