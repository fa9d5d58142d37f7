//! # Block Requests
//!
//! The request type consumed by the volume downloader.
//!
//! ## Overview
//!
//! Upstream stages drive the downloader with a single ordered stream of
//! `BlockRequest` values. A request either asks for a volume's download
//! handle (`Fetch`) or signals that a cached volume is no longer needed
//! (`Evict`). Modelling eviction as its own variant rather than a flag makes
//! the no-output-on-eviction contract visible at the type level: only
//! `Fetch` requests ever appear on the output channel.

use backend_traits::VolumeId;
use serde::{Deserialize, Serialize};

/// A single instruction for the volume downloader.
///
/// Both variants travel on the same input channel and are processed in
/// strict arrival order, so an `Evict` issued after a `Fetch` for the same
/// volume always observes that fetch already reflected in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "volume", rename_all = "lowercase")]
pub enum BlockRequest {
    /// Fetch-or-reuse: produce exactly one output pair carrying this
    /// volume's download handle.
    Fetch(VolumeId),
    /// Release-intent: drop the volume from the cache and release its
    /// handle. Produces no output.
    Evict(VolumeId),
}

impl BlockRequest {
    /// The volume this request refers to.
    pub fn volume_id(&self) -> VolumeId {
        match self {
            BlockRequest::Fetch(id) | BlockRequest::Evict(id) => *id,
        }
    }

    /// Whether this request is an eviction signal.
    pub fn is_evict(&self) -> bool {
        matches!(self, BlockRequest::Evict(_))
    }
}
