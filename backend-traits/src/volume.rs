//! Volume identity and metadata.
//!
//! A volume is a remote storage unit holding many blocks; it is always fetched
//! as a whole. Volumes are identified by [`VolumeId`], the rowid assigned by
//! the index that catalogued them, and described by [`VolumeInfo`], the
//! remote name, size, and content hash needed to initiate a transfer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Result;

/// Identifier of a remote volume, assigned by the volume index.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VolumeId(i64);

impl VolumeId {
    /// Create an id from its raw index value.
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// The raw index value.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for VolumeId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Remote metadata for one volume: everything a backend needs to fetch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeInfo {
    /// Remote object name (e.g. `vault-b0001.zvol`).
    pub name: String,
    /// Size of the remote object in bytes.
    pub size: i64,
    /// Content hash recorded at backup time (lowercase hex). May be empty
    /// for volumes written before hashing was enabled.
    pub hash: String,
}

impl VolumeInfo {
    pub fn new(name: impl Into<String>, size: i64, hash: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            hash: hash.into(),
        }
    }
}

/// Read-only lookup from volume id to remote metadata.
///
/// Implementations wrap whatever store catalogued the backup (the SQLite
/// index in local deployments). `Ok(None)` means the id is unknown; `Err`
/// means the lookup itself failed. Callers treat both as fatal for the
/// volume in question.
#[async_trait]
pub trait VolumeIndex: Send + Sync {
    /// Resolve a volume id to its remote name, size, and hash.
    async fn volume_info(&self, volume: VolumeId) -> Result<Option<VolumeInfo>>;
}
