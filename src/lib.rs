//! ringsched - a bounded task queue with a fixed worker pool
//!
//! Producers hand [`Task`]s to a [`Scheduler`]; a static pool of worker
//! threads takes them out in FIFO order and runs their callbacks. The queue
//! has a fixed number of slots, and submission blocks while all of them are
//! taken, so a slow pool pushes back on its producers instead of growing.
//!
//! # Quick Start
//!
//! ```no_run
//! use ringsched::prelude::*;
//!
//! let config = Config::builder()
//!     .capacity(64)
//!     .num_threads(4)
//!     .label("rpc")
//!     .build()
//!     .unwrap();
//! let scheduler = Scheduler::new(config).unwrap();
//!
//! scheduler
//!     .submit(Task::new(|task| {
//!         let n = task.payload_as::<u32>().copied().unwrap_or_default();
//!         println!("got {}", n);
//!     }).with_payload(42u32))
//!     .unwrap();
//!
//! scheduler.shutdown();
//! ```
//!
//! # Flow control
//!
//! Two counting semaphores carry the handoff: one counts free slots, the
//! other counts filled ones. A mutex guards the slot array and its indices
//! and is never held across a wait or a callback.
//!
//! # Shutdown
//!
//! Shutdown is cooperative. Workers finish the callback they are running,
//! then exit; tasks still queued are dropped. See [`Scheduler::shutdown`].

#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod scheduler;
pub mod sync;
pub mod telemetry;
pub mod timer;

use std::sync::Arc;

pub use config::{Config, ConfigBuilder, ErrorPolicy};
pub use error::{Error, Result};
pub use executor::{Callback, Handle, PanicStrategy, SubmitStatus, Task, TaskId};
pub use scheduler::Scheduler;
pub use telemetry::{MetricsSnapshot, QueueStatus};
pub use timer::{ThreadTimer, TimerId, TimerService};

/// Build a scheduler with `capacity` slots and `worker_count` workers.
///
/// If `timer` is given, queue depth is sampled on it periodically.
pub fn create(
    capacity: usize,
    worker_count: usize,
    label: &str,
    timer: Option<Arc<dyn TimerService>>,
) -> Result<Scheduler> {
    let config = Config::builder()
        .capacity(capacity)
        .num_threads(worker_count)
        .label(label)
        .build()?;

    match timer {
        Some(timer) => Scheduler::with_timer(config, timer),
        None => Scheduler::new(config),
    }
}

/// Queue `task` on `scheduler`, blocking until a slot is free.
///
/// With no scheduler the task is dropped and the call returns at once.
pub fn submit(scheduler: Option<&Scheduler>, task: Task) -> Result<SubmitStatus> {
    match scheduler {
        Some(scheduler) => scheduler.submit(task),
        None => {
            tracing::error!(task = ?task.id(), "scheduler is not ready, task dropped");
            Ok(SubmitStatus::Dropped)
        }
    }
}

/// Shut down and release `scheduler`. Does nothing for `None`.
pub fn destroy(scheduler: Option<Scheduler>) {
    if let Some(scheduler) = scheduler {
        scheduler.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    #[test]
    fn test_submit_without_scheduler_is_dropped() {
        let start = Instant::now();
        let status = submit(None, Task::new(|_| unreachable!())).unwrap();
        assert_eq!(status, SubmitStatus::Dropped);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_destroy_none_is_noop() {
        destroy(None);
    }

    #[test]
    fn test_create_submit_destroy() {
        let scheduler = create(8, 2, "lib", None).unwrap();
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let counter = counter.clone();
            let status = submit(
                Some(&scheduler),
                Task::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();
            assert_eq!(status, SubmitStatus::Queued);
        }

        while scheduler.metrics().tasks_dispatched < 20 {
            std::thread::yield_now();
        }
        destroy(Some(scheduler));
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_create_rejects_zero_sizes() {
        assert!(matches!(create(0, 1, "bad", None), Err(Error::Config(_))));
        assert!(matches!(create(1, 0, "bad", None), Err(Error::Config(_))));
    }

    #[test]
    fn test_long_label_is_truncated() {
        let scheduler = create(1, 1, "a-label-well-past-the-limit", None).unwrap();
        assert_eq!(scheduler.label(), "a-label-well-pa");
    }
}
