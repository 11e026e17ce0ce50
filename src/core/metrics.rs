//! Queue metrics for observability
//!
//! Counters for monitoring the async write queue, including overflow
//! drops, blocking events and rejected submissions.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for one async queue
///
/// # Example
///
/// ```
/// use rust_scoped_logger::core::QueueMetrics;
///
/// let metrics = QueueMetrics::new();
/// metrics.record_submitted();
/// metrics.record_dropped();
///
/// assert_eq!(metrics.submitted_count(), 1);
/// assert_eq!(metrics.dropped_count(), 1);
/// ```
#[derive(Debug)]
pub struct QueueMetrics {
    /// Tasks accepted into the queue
    submitted: AtomicU64,

    /// Tasks the consumer ran to completion
    written: AtomicU64,

    /// Tasks discarded by an overflow policy or a forced termination
    dropped: AtomicU64,

    /// Number of times a submission found the queue full
    queue_full_events: AtomicU64,

    /// Number of timed waits under BlockUntilSpace
    block_events: AtomicU64,

    /// Submissions refused after termination
    rejected: AtomicU64,
}

impl QueueMetrics {
    pub const fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            written: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            queue_full_events: AtomicU64::new(0),
            block_events: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn submitted_count(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn written_count(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn queue_full_events(&self) -> u64 {
        self.queue_full_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn block_events(&self) -> u64 {
        self.block_events.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_submitted(&self) -> u64 {
        self.submitted.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_written(&self) -> u64 {
        self.written.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed)
    }

    /// Record several drops at once, e.g. tasks abandoned by a forced termination
    #[inline]
    pub fn record_dropped_many(&self, count: u64) -> u64 {
        self.dropped.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_queue_full(&self) -> u64 {
        self.queue_full_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_block(&self) -> u64 {
        self.block_events.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_rejected(&self) -> u64 {
        self.rejected.fetch_add(1, Ordering::Relaxed)
    }

    /// Drop rate as a percentage (0.0 - 100.0) of everything submitted
    ///
    /// Returns 0.0 if nothing has been submitted.
    pub fn drop_rate(&self) -> f64 {
        let submitted = self.submitted_count() as f64;
        if submitted == 0.0 {
            0.0
        } else {
            (self.dropped_count() as f64 / submitted) * 100.0
        }
    }

    pub fn reset(&self) {
        self.submitted.store(0, Ordering::Relaxed);
        self.written.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
        self.queue_full_events.store(0, Ordering::Relaxed);
        self.block_events.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
    }
}

impl Default for QueueMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for QueueMetrics {
    /// Snapshot of the current values
    fn clone(&self) -> Self {
        Self {
            submitted: AtomicU64::new(self.submitted_count()),
            written: AtomicU64::new(self.written_count()),
            dropped: AtomicU64::new(self.dropped_count()),
            queue_full_events: AtomicU64::new(self.queue_full_events()),
            block_events: AtomicU64::new(self.block_events()),
            rejected: AtomicU64::new(self.rejected_count()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = QueueMetrics::new();
        assert_eq!(metrics.submitted_count(), 0);
        assert_eq!(metrics.written_count(), 0);
        assert_eq!(metrics.dropped_count(), 0);
        assert_eq!(metrics.rejected_count(), 0);
    }

    #[test]
    fn test_record_returns_previous_value() {
        let metrics = QueueMetrics::new();
        assert_eq!(metrics.record_dropped(), 0);
        assert_eq!(metrics.record_dropped_many(3), 1);
        assert_eq!(metrics.dropped_count(), 4);
    }

    #[test]
    fn test_metrics_drop_rate() {
        let metrics = QueueMetrics::new();
        assert_eq!(metrics.drop_rate(), 0.0);

        for _ in 0..100 {
            metrics.record_submitted();
        }
        for _ in 0..10 {
            metrics.record_dropped();
        }
        let rate = metrics.drop_rate();
        assert!((rate - 10.0).abs() < f64::EPSILON, "Drop rate was {}", rate);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let metrics = QueueMetrics::new();
        metrics.record_written();
        let snapshot = metrics.clone();
        metrics.record_written();
        assert_eq!(snapshot.written_count(), 1);
        assert_eq!(metrics.written_count(), 2);

        metrics.reset();
        assert_eq!(metrics.written_count(), 0);
    }
}
