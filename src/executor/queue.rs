//! Bounded task queue shared by producers and workers.
//!
//! Two semaphores carry the flow control: `free` counts slots a producer may
//! write into, `filled` counts slots holding an unclaimed task. Neither is
//! ever touched while the ring's guard is held.

use super::panic_handler::PanicHandler;
use super::ring::{Rejected, SlotRing};
use super::task::{Dispatch, Task};
use crate::config::{Config, ErrorPolicy};
use crate::error::{Error, Result};
use crate::sync::{AcquireError, Semaphore};
use crate::telemetry::{Diagnostics, Metrics, QueueStatus};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

/// Outcome of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStatus {
    /// The task occupies a slot and will be dispatched.
    Queued,
    /// The task was thrown away without running.
    Dropped,
}

/// What a worker got back from [`TaskQueue::claim`].
#[derive(Debug)]
pub(crate) enum Claim {
    Task(Task),
    /// `filled` was signalled but the slot was empty.
    Empty,
    Closed,
}

#[derive(Debug)]
pub(crate) struct TaskQueue {
    label: String,
    ring: SlotRing,
    free: Semaphore,
    filled: Semaphore,
    stopping: AtomicBool,
    workers: AtomicUsize,
    error_policy: ErrorPolicy,
    panic_handler: PanicHandler,
    metrics: Metrics,
    diagnostics: Option<Diagnostics>,
}

impl TaskQueue {
    pub fn new(config: &Config, label: String, diagnostics: Option<Diagnostics>) -> Result<Self> {
        let ring = SlotRing::new(config.capacity)?;

        Ok(Self {
            label,
            free: Semaphore::new(config.capacity),
            filled: Semaphore::new(0),
            ring,
            stopping: AtomicBool::new(false),
            workers: AtomicUsize::new(0),
            error_policy: config.error_policy,
            panic_handler: PanicHandler::new(config.panic_strategy),
            metrics: Metrics::new(),
            diagnostics,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        self.diagnostics.as_ref()
    }

    pub fn error_policy(&self) -> ErrorPolicy {
        self.error_policy
    }

    pub fn worker_started(&self) {
        self.workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_exited(&self) {
        self.workers.fetch_sub(1, Ordering::Relaxed);
    }

    /// Live worker threads; shrinks as workers exit during teardown.
    pub fn worker_count(&self) -> usize {
        self.workers.load(Ordering::Relaxed)
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Best-effort snapshot, taken without the guard.
    pub fn status(&self) -> QueueStatus {
        QueueStatus {
            label: self.label.clone(),
            depth: self.ring.depth(),
            capacity: self.ring.capacity(),
            workers: self.worker_count(),
        }
    }

    pub fn depth(&self) -> usize {
        self.ring.depth()
    }

    pub fn occupied(&self) -> usize {
        self.ring.occupied()
    }

    /// Block until a slot is free, then publish `task` into it.
    pub fn enqueue(&self, task: Task) -> Result<SubmitStatus> {
        if self.is_stopping() {
            return self.reject(task);
        }

        if let Err(AcquireError::Closed) = self.free.acquire() {
            return self.reject(task);
        }

        match self.ring.push(task) {
            Ok(()) => {}
            Err(Rejected::Closed(task)) => return self.reject(task),
            Err(Rejected::Occupied(task)) => match self.error_policy {
                ErrorPolicy::Strict => {
                    self.free.release();
                    self.metrics.record_dropped(1);
                    return Err(Error::sync(format!(
                        "{}: slot {} still holds an unclaimed task",
                        self.label,
                        self.ring.write_index()
                    )));
                }
                ErrorPolicy::Lenient => {
                    tracing::error!(
                        label = %self.label,
                        slot = self.ring.write_index(),
                        "slot still holds an unclaimed task, overwriting"
                    );
                    if self.ring.force_push(task).is_some() {
                        self.metrics.record_dropped(1);
                    }
                }
            },
        }

        self.metrics.record_submitted();
        self.filled.release();
        Ok(SubmitStatus::Queued)
    }

    fn reject(&self, task: Task) -> Result<SubmitStatus> {
        self.metrics.record_dropped(1);
        match self.error_policy {
            ErrorPolicy::Strict => Err(Error::ShutDown {
                label: self.label.clone(),
            }),
            ErrorPolicy::Lenient => {
                tracing::error!(label = %self.label, task = ?task.id(), "scheduler is shut down, task dropped");
                Ok(SubmitStatus::Dropped)
            }
        }
    }

    /// Block until a task is available and take it out of its slot.
    pub fn claim(&self) -> Claim {
        if self.filled.acquire().is_err() {
            return Claim::Closed;
        }

        let task = self.ring.pop();
        self.free.release();

        match task {
            Some(task) => Claim::Task(task),
            None => Claim::Empty,
        }
    }

    /// Run the task's callback, keeping panics inside the worker.
    pub fn dispatch(&self, task: Task) {
        let id = task.id();
        let start = Instant::now();
        let result = self.panic_handler.run(&self.label, || task.dispatch());
        let duration_ns = start.elapsed().as_nanos() as u64;

        match result {
            Ok(Dispatch::Ran) => self.metrics.record_dispatched(duration_ns),
            Ok(Dispatch::Discarded) => {
                tracing::warn!(label = %self.label, task = ?id, "task has no callback, discarded");
                self.metrics.record_discarded();
            }
            Err(_) => {
                self.metrics.record_panic();
                self.metrics.record_dispatched(duration_ns);
            }
        }
    }

    /// Stop accepting work and wake every blocked producer and worker.
    ///
    /// Returns `false` if the queue was already closed.
    pub fn close(&self) -> bool {
        if self.stopping.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.filled.close();
        self.free.close();
        true
    }

    /// Drop whatever is still queued and refuse anything submitted later.
    /// Only meaningful once workers are gone.
    pub fn discard_remaining(&self) -> usize {
        let dropped = self.ring.close();
        if dropped > 0 {
            self.metrics.record_dropped(dropped as u64);
        }
        dropped
    }

    /// Leave a task in the slot the next push will target, as if a claim
    /// had gone missing.
    #[cfg(test)]
    pub(crate) fn plant_stale(&self, task: Task) {
        self.ring.plant_at_write_index(task);
    }

    /// Signal `filled` without publishing anything.
    #[cfg(test)]
    pub(crate) fn signal_phantom(&self) {
        self.filled.release();
    }
}
