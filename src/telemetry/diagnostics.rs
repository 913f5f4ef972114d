//! Periodic queue-depth sampling driven by a [`TimerService`].
//!
//! Each firing checks that it belongs to the currently armed timer, logs the
//! queue status when anything is waiting, and arms the next firing. Stale
//! firings (after a re-arm or teardown) are ignored and do not re-arm.

use crate::executor::queue::TaskQueue;
use crate::timer::{TimerId, TimerService};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Point-in-time view of a scheduler's queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatus {
    pub label: String,
    /// Tasks queued but not yet claimed, in `[0, capacity]`.
    pub depth: usize,
    pub capacity: usize,
    pub workers: usize,
}

pub(crate) struct Diagnostics {
    timer: Arc<dyn TimerService>,
    interval: Duration,
    armed: Mutex<Option<TimerId>>,
}

impl Diagnostics {
    pub fn new(timer: Arc<dyn TimerService>, interval: Duration) -> Self {
        Self {
            timer,
            interval,
            armed: Mutex::new(None),
        }
    }

    /// Arm the first firing. Returns `false` if the timer refused.
    pub fn start(queue: &Arc<TaskQueue>) -> bool {
        let Some(diagnostics) = queue.diagnostics() else {
            return false;
        };

        let mut armed = diagnostics.armed.lock();
        *armed = diagnostics.arm_next(queue);
        if armed.is_none() {
            tracing::warn!(label = queue.label(), "failed to arm diagnostics timer");
        }
        armed.is_some()
    }

    /// Handle one firing. Returns the sampled status if the firing was live.
    pub fn on_fire(queue: &Arc<TaskQueue>, fired: TimerId) -> Option<QueueStatus> {
        let diagnostics = queue.diagnostics()?;
        let mut armed = diagnostics.armed.lock();

        if *armed != Some(fired) || queue.is_stopping() {
            return None;
        }

        let status = queue.status();
        if status.depth > 0 {
            tracing::trace!(
                label = %status.label,
                depth = status.depth,
                workers = status.workers,
                "scheduler queue status"
            );
        }

        *armed = diagnostics.arm_next(queue);
        Some(status)
    }

    /// Disarm the pending firing, if any.
    pub fn stop(&self) {
        if let Some(id) = self.armed.lock().take() {
            self.timer.disarm(id);
        }
    }

    pub fn armed(&self) -> Option<TimerId> {
        *self.armed.lock()
    }

    fn arm_next(&self, queue: &Arc<TaskQueue>) -> Option<TimerId> {
        let weak: Weak<TaskQueue> = Arc::downgrade(queue);
        self.timer.arm(
            self.interval,
            Box::new(move |fired| {
                if let Some(queue) = weak.upgrade() {
                    Diagnostics::on_fire(&queue, fired);
                }
            }),
        )
    }
}

impl std::fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diagnostics")
            .field("interval", &self.interval)
            .field("armed", &self.armed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::Config;
    use crate::executor::Task;
    use crate::timer::TimerCallback;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Timer that only fires when the test says so.
    #[derive(Default)]
    pub(crate) struct ManualTimer {
        next_id: AtomicU64,
        pending: parking_lot::Mutex<HashMap<TimerId, TimerCallback>>,
        disarmed: parking_lot::Mutex<Vec<TimerId>>,
    }

    impl ManualTimer {
        pub fn pending_ids(&self) -> Vec<TimerId> {
            let mut ids: Vec<_> = self.pending.lock().keys().copied().collect();
            ids.sort();
            ids
        }

        pub fn disarmed(&self) -> Vec<TimerId> {
            self.disarmed.lock().clone()
        }

        /// Fire `id` as if it came due, optionally posing as another id.
        pub fn fire_as(&self, id: TimerId, reported: TimerId) -> bool {
            let callback = self.pending.lock().remove(&id);
            match callback {
                Some(callback) => {
                    callback(reported);
                    true
                }
                None => false,
            }
        }

        pub fn fire(&self, id: TimerId) -> bool {
            self.fire_as(id, id)
        }
    }

    impl TimerService for ManualTimer {
        fn arm(&self, _interval: Duration, callback: TimerCallback) -> Option<TimerId> {
            let id = TimerId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
            self.pending.lock().insert(id, callback);
            Some(id)
        }

        fn disarm(&self, id: TimerId) {
            self.pending.lock().remove(&id);
            self.disarmed.lock().push(id);
        }
    }

    fn queue_with(timer: Arc<ManualTimer>) -> Arc<TaskQueue> {
        let config = Config::builder().capacity(4).build().unwrap();
        let diagnostics = Diagnostics::new(timer, Duration::from_secs(30));
        Arc::new(TaskQueue::new(&config, "diag".to_string(), Some(diagnostics)).unwrap())
    }

    #[test]
    fn test_firing_samples_and_rearms() {
        let timer = Arc::new(ManualTimer::default());
        let queue = queue_with(timer.clone());
        assert!(Diagnostics::start(&queue));

        let first = timer.pending_ids()[0];
        queue.enqueue(Task::new(|_| {})).unwrap();
        queue.enqueue(Task::new(|_| {})).unwrap();

        let status = Diagnostics::on_fire(&queue, first).unwrap();
        assert_eq!(status.depth, 2);
        assert_eq!(status.capacity, 4);
        assert_eq!(status.label, "diag");

        let next = queue.diagnostics().unwrap().armed().unwrap();
        assert_ne!(next, first);
        assert_eq!(timer.pending_ids(), vec![first, next]);
    }

    #[test]
    fn test_stale_firing_is_ignored() {
        let timer = Arc::new(ManualTimer::default());
        let queue = queue_with(timer.clone());
        Diagnostics::start(&queue);

        let live = timer.pending_ids()[0];
        let stale = TimerId::from_raw(live.as_u64() + 100);

        assert!(timer.fire_as(live, stale));
        // the live timer was consumed by a stale firing, nothing re-armed
        assert!(timer.pending_ids().is_empty());
        assert_eq!(queue.diagnostics().unwrap().armed(), Some(live));
    }

    #[test]
    fn test_firing_through_the_timer_rearms() {
        let timer = Arc::new(ManualTimer::default());
        let queue = queue_with(timer.clone());
        Diagnostics::start(&queue);

        for _ in 0..3 {
            let id = timer.pending_ids()[0];
            assert!(timer.fire(id));
            assert_eq!(timer.pending_ids().len(), 1);
        }
    }

    #[test]
    fn test_stop_disarms() {
        let timer = Arc::new(ManualTimer::default());
        let queue = queue_with(timer.clone());
        Diagnostics::start(&queue);
        let id = timer.pending_ids()[0];

        queue.diagnostics().unwrap().stop();
        assert_eq!(timer.disarmed(), vec![id]);
        assert!(timer.pending_ids().is_empty());
        assert!(Diagnostics::on_fire(&queue, id).is_none());
    }

    #[test]
    fn test_firing_after_queue_dropped_is_harmless() {
        let timer = Arc::new(ManualTimer::default());
        let queue = queue_with(timer.clone());
        Diagnostics::start(&queue);
        let id = timer.pending_ids()[0];

        drop(queue);
        assert!(timer.fire(id));
        assert!(timer.pending_ids().is_empty());
    }
}
