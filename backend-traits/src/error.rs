use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Fetch rejected: {0}")]
    FetchRejected(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Download handle already released")]
    HandleReleased,

    #[error("Index error: {0}")]
    Index(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BackendError>;
