use backend_traits::BackendError;
use backend_traits::VolumeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Metadata lookup failed for volume {volume}: {message}")]
    MetadataLookup { volume: VolumeId, message: String },

    #[error("Fetch initiation failed for volume {volume}: {message}")]
    FetchInitiation { volume: VolumeId, message: String },

    #[error("Output channel closed while downloader still running")]
    OutputClosed,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

pub type Result<T> = std::result::Result<T, RestoreError>;
