//! Cumulative per-stage timing for the downloader loop.
//!
//! Purely observational. When profiling is enabled the loop accumulates the
//! time it spends in each of its four phases and logs the totals once at
//! retirement.

use std::time::Duration;
use tracing::info;

/// Cumulative time spent in each downloader phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    /// Blocked waiting for the next request.
    pub receive: Duration,
    /// Fetch-or-reuse handling, cache hit and miss alike.
    pub cache_insert: Duration,
    /// Eviction handling including the wait-then-release.
    pub cache_evict: Duration,
    /// Blocked sending an output pair downstream.
    pub send: Duration,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_receive(&mut self, elapsed: Duration) {
        self.receive += elapsed;
    }

    pub fn record_cache_insert(&mut self, elapsed: Duration) {
        self.cache_insert += elapsed;
    }

    pub fn record_cache_evict(&mut self, elapsed: Duration) {
        self.cache_evict += elapsed;
    }

    pub fn record_send(&mut self, elapsed: Duration) {
        self.send += elapsed;
    }

    /// Total time across all four phases.
    pub fn total(&self) -> Duration {
        self.receive + self.cache_insert + self.cache_evict + self.send
    }

    /// Logs the accumulated totals. Called once at retirement.
    pub fn log_summary(&self) {
        info!(
            receive_ms = self.receive.as_millis() as u64,
            cache_insert_ms = self.cache_insert.as_millis() as u64,
            cache_evict_ms = self.cache_evict.as_millis() as u64,
            send_ms = self.send.as_millis() as u64,
            total_ms = self.total().as_millis() as u64,
            "Downloader stage timings"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulation() {
        let mut timings = StageTimings::new();
        timings.record_receive(Duration::from_millis(5));
        timings.record_receive(Duration::from_millis(7));
        timings.record_send(Duration::from_millis(3));

        assert_eq!(timings.receive, Duration::from_millis(12));
        assert_eq!(timings.send, Duration::from_millis(3));
        assert_eq!(timings.cache_insert, Duration::ZERO);
        assert_eq!(timings.total(), Duration::from_millis(15));
    }

    #[test]
    fn test_default_is_zero() {
        let timings = StageTimings::default();
        assert_eq!(timings.total(), Duration::ZERO);
    }
}
