//! Downloader configuration.

use crate::{RestoreError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a [`VolumeDownloader`](crate::VolumeDownloader).
///
/// ```rust
/// use core_restore::RestoreConfig;
///
/// let config = RestoreConfig::default()
///     .with_request_capacity(128)
///     .with_profiling(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreConfig {
    /// Bound of the inbound request channel created by `spawn`.
    pub request_capacity: usize,

    /// Bound of the outbound channel created by `spawn`. A full output
    /// channel suspends the loop (backpressure) without affecting sibling
    /// pipeline stages.
    pub output_capacity: usize,

    /// Accumulate per-phase timings and log them once at retirement.
    pub profile_stages: bool,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            request_capacity: 64,
            output_capacity: 64,
            profile_stages: false,
        }
    }
}

impl RestoreConfig {
    pub fn with_request_capacity(mut self, capacity: usize) -> Self {
        self.request_capacity = capacity;
        self
    }

    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.output_capacity = capacity;
        self
    }

    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profile_stages = enabled;
        self
    }

    /// Rejects configurations that cannot form working channels.
    pub fn validate(&self) -> Result<()> {
        if self.request_capacity == 0 {
            return Err(RestoreError::Config(
                "request_capacity must be greater than zero".to_string(),
            ));
        }
        if self.output_capacity == 0 {
            return Err(RestoreError::Config(
                "output_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RestoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_capacity, 64);
        assert_eq!(config.output_capacity, 64);
        assert!(!config.profile_stages);
    }

    #[test]
    fn test_builders() {
        let config = RestoreConfig::default()
            .with_request_capacity(8)
            .with_output_capacity(16)
            .with_profiling(true);

        assert_eq!(config.request_capacity, 8);
        assert_eq!(config.output_capacity, 16);
        assert!(config.profile_stages);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = RestoreConfig::default().with_request_capacity(0);
        assert!(matches!(
            config.validate(),
            Err(RestoreError::Config(_))
        ));

        let config = RestoreConfig::default().with_output_capacity(0);
        assert!(config.validate().is_err());
    }
}
