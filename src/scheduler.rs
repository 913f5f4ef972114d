use crate::config::Config;
use crate::error::Result;
use crate::executor::pool::WorkerPool;
use crate::executor::queue::TaskQueue;
use crate::executor::{SubmitStatus, Task};
use crate::telemetry::{Diagnostics, MetricsSnapshot, QueueStatus};
use crate::timer::{TimerId, TimerService};
use std::sync::Arc;

/// A bounded task queue serviced by a fixed pool of worker threads.
///
/// [`submit`](Scheduler::submit) blocks while every slot is taken. Workers
/// dispatch tasks in the order their slots were filled. Dropping the
/// scheduler shuts it down and joins every worker.
pub struct Scheduler {
    queue: Arc<TaskQueue>,
    pool: WorkerPool,
}

impl Scheduler {
    pub fn new(config: Config) -> Result<Self> {
        Self::start(config, None)
    }

    /// Like [`Scheduler::new`], and also samples queue depth on `timer`
    /// every `config.diagnostics_interval`.
    ///
    /// Failing to arm the timer is logged and does not fail construction.
    pub fn with_timer(config: Config, timer: Arc<dyn TimerService>) -> Result<Self> {
        Self::start(config, Some(timer))
    }

    fn start(config: Config, timer: Option<Arc<dyn TimerService>>) -> Result<Self> {
        config.validate()?;

        let label = config.truncated_label();
        let diagnostics = timer.map(|timer| Diagnostics::new(timer, config.diagnostics_interval));
        let queue = TaskQueue::new(&config, label.clone(), diagnostics).map_err(|e| {
            tracing::error!(label = %label, error = %e, "failed to create scheduler");
            e
        })?;

        let scheduler = Self::launch(&config, Arc::new(queue))?;
        Diagnostics::start(&scheduler.queue);
        Ok(scheduler)
    }

    /// Start every worker, unwinding the ones already running on failure.
    fn launch(config: &Config, queue: Arc<TaskQueue>) -> Result<Self> {
        let num_threads = config.worker_threads();
        let pool = WorkerPool::with_capacity(num_threads)?;
        let scheduler = Self { queue, pool };

        for id in 0..num_threads {
            if let Err(e) = scheduler.pool.spawn(config, id, &scheduler.queue) {
                tracing::error!(label = scheduler.label(), error = %e, "failed to create worker thread");
                scheduler.shutdown();
                return Err(e);
            }
        }

        tracing::trace!(
            label = scheduler.label(),
            workers = num_threads,
            "scheduler is initialized"
        );
        Ok(scheduler)
    }

    /// Queue `task`, blocking until a slot is free.
    pub fn submit(&self, task: Task) -> Result<SubmitStatus> {
        self.queue.enqueue(task)
    }

    /// Queue a closure that takes no arguments.
    pub fn execute<F>(&self, f: F) -> Result<SubmitStatus>
    where
        F: FnOnce() + Send + 'static,
    {
        self.submit(Task::new(move |_| f()))
    }

    pub fn label(&self) -> &str {
        self.queue.label()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn num_workers(&self) -> usize {
        self.queue.worker_count()
    }

    /// Unsynchronized count of queued, unclaimed tasks.
    pub fn depth(&self) -> usize {
        self.queue.depth()
    }

    pub fn status(&self) -> QueueStatus {
        self.queue.status()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.queue.metrics().snapshot()
    }

    /// Id of the pending diagnostics firing, if diagnostics are running.
    pub fn diagnostics_timer(&self) -> Option<TimerId> {
        self.queue.diagnostics().and_then(|d| d.armed())
    }

    pub fn is_shutdown(&self) -> bool {
        self.queue.is_stopping()
    }

    /// Stop the workers and release queued tasks. Safe to call repeatedly.
    ///
    /// Callbacks already running finish before their worker exits; tasks
    /// still queued are dropped without running. Producers blocked in
    /// [`submit`](Scheduler::submit) are woken and see the scheduler as shut down.
    ///
    /// Called from inside a callback, this closes the queue but cannot wait
    /// for the calling worker; the next call from any other thread does.
    pub fn shutdown(&self) {
        if self.queue.close() {
            tracing::debug!(label = self.label(), "scheduler stopping");
            if let Some(diagnostics) = self.queue.diagnostics() {
                diagnostics.stop();
            }
        }

        self.pool.join_all(self.queue.label());

        let dropped = self.queue.discard_remaining();
        if dropped > 0 {
            tracing::debug!(label = self.label(), dropped, "queued tasks dropped at shutdown");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
        // no-op unless the last handle was released inside a callback
        self.pool.join_except_current(self.queue.label());
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("label", &self.label())
            .field("capacity", &self.capacity())
            .field("workers", &self.pool)
            .field("depth", &self.depth())
            .finish()
    }
}
