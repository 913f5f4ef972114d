//! Counters for scheduler activity.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Scheduler metrics collector
#[derive(Debug)]
pub struct Metrics {
    tasks_submitted: AtomicU64,
    tasks_dispatched: AtomicU64,
    tasks_dropped: AtomicU64,
    tasks_discarded: AtomicU64,
    tasks_panicked: AtomicU64,
    busy_time_ns: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            tasks_submitted: AtomicU64::new(0),
            tasks_dispatched: AtomicU64::new(0),
            tasks_dropped: AtomicU64::new(0),
            tasks_discarded: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// A task was committed to a slot
    pub fn record_submitted(&self) {
        self.tasks_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// A callback returned (or panicked) after `duration_ns`
    pub fn record_dispatched(&self, duration_ns: u64) {
        self.tasks_dispatched.fetch_add(1, Ordering::Relaxed);
        self.busy_time_ns.fetch_add(duration_ns, Ordering::Relaxed);
    }

    /// Tasks that never reached a slot or were thrown away at teardown
    pub fn record_dropped(&self, count: u64) {
        self.tasks_dropped.fetch_add(count, Ordering::Relaxed);
    }

    /// A claimed task had no callback
    pub fn record_discarded(&self) {
        self.tasks_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.tasks_panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            tasks_submitted: self.tasks_submitted.load(Ordering::Relaxed),
            tasks_dispatched: self.tasks_dispatched.load(Ordering::Relaxed),
            tasks_dropped: self.tasks_dropped.load(Ordering::Relaxed),
            tasks_discarded: self.tasks_discarded.load(Ordering::Relaxed),
            tasks_panicked: self.tasks_panicked.load(Ordering::Relaxed),
            busy_time_ns: self.busy_time_ns.load(Ordering::Relaxed),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub tasks_submitted: u64,
    pub tasks_dispatched: u64,
    pub tasks_dropped: u64,
    pub tasks_discarded: u64,
    pub tasks_panicked: u64,
    pub busy_time_ns: u64,
}

impl MetricsSnapshot {
    /// Dispatched tasks per second of uptime
    pub fn tasks_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.tasks_dispatched as f64 / seconds
    }

    /// Mean time spent inside a callback
    pub fn avg_dispatch_ns(&self) -> u64 {
        if self.tasks_dispatched == 0 {
            return 0;
        }
        self.busy_time_ns / self.tasks_dispatched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_basic() {
        let metrics = Metrics::new();

        metrics.record_submitted();
        metrics.record_submitted();
        metrics.record_dispatched(1000);
        metrics.record_dispatched(3000);
        metrics.record_dropped(2);
        metrics.record_discarded();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tasks_submitted, 2);
        assert_eq!(snapshot.tasks_dispatched, 2);
        assert_eq!(snapshot.tasks_dropped, 2);
        assert_eq!(snapshot.tasks_discarded, 1);
        assert_eq!(snapshot.tasks_panicked, 0);
        assert_eq!(snapshot.avg_dispatch_ns(), 2000);
    }

    #[test]
    fn test_rates_on_empty_snapshot() {
        let snapshot = MetricsSnapshot {
            uptime: Duration::ZERO,
            tasks_submitted: 0,
            tasks_dispatched: 0,
            tasks_dropped: 0,
            tasks_discarded: 0,
            tasks_panicked: 0,
            busy_time_ns: 0,
        };

        assert_eq!(snapshot.tasks_per_second(), 0.0);
        assert_eq!(snapshot.avg_dispatch_ns(), 0);
    }
}
