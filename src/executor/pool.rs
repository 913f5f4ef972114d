use super::queue::TaskQueue;
use super::worker::{Worker, WorkerId};
use crate::config::Config;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

struct WorkerHandle {
    id: WorkerId,
    thread: JoinHandle<()>,
}

/// The fixed set of worker threads servicing one [`TaskQueue`].
///
/// The handle list is only locked to push or take handles, never across a
/// join, so a callback that calls back into teardown cannot stall a join
/// that is already waiting on it.
pub(crate) struct WorkerPool {
    workers: Mutex<Vec<WorkerHandle>>,
    thread_ids: Mutex<Vec<ThreadId>>,
    teardown: Mutex<()>,
}

impl WorkerPool {
    /// Reserve room for `num_threads` handles without starting anything.
    pub fn with_capacity(num_threads: usize) -> Result<Self> {
        let mut workers = Vec::new();
        workers
            .try_reserve_exact(num_threads)
            .map_err(|_| Error::out_of_memory("worker handles"))?;

        let mut thread_ids = Vec::new();
        thread_ids
            .try_reserve_exact(num_threads)
            .map_err(|_| Error::out_of_memory("worker handles"))?;

        Ok(Self {
            workers: Mutex::new(workers),
            thread_ids: Mutex::new(thread_ids),
            teardown: Mutex::new(()),
        })
    }

    /// Start worker `id` running against `queue`.
    pub fn spawn(&self, config: &Config, id: WorkerId, queue: &Arc<TaskQueue>) -> Result<()> {
        #[cfg(test)]
        {
            if config.fail_spawn_at == Some(id) {
                return Err(Error::Spawn {
                    index: id,
                    source: std::io::Error::new(std::io::ErrorKind::Other, "injected spawn failure"),
                });
            }
        }

        let mut builder = thread::Builder::new().name(config.thread_name(id));

        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        // counted before the thread runs so its exit can never be seen first
        queue.worker_started();
        let worker = Worker::new(id, queue.clone());
        let exiting = queue.clone();
        let thread = match builder.spawn(move || {
            worker.run();
            exiting.worker_exited();
        }) {
            Ok(thread) => thread,
            Err(source) => {
                queue.worker_exited();
                return Err(Error::Spawn { index: id, source });
            }
        };

        self.thread_ids.lock().push(thread.thread().id());
        self.workers.lock().push(WorkerHandle { id, thread });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.workers.lock().len()
    }

    fn is_worker(&self, thread: ThreadId) -> bool {
        self.thread_ids.lock().contains(&thread)
    }

    /// Join every started worker. The queue must already be closed.
    ///
    /// Called from one of the pool's own workers this returns at once and
    /// leaves every handle in place for the next caller on another thread.
    /// Concurrent callers are serialized, so each returns only once all
    /// workers are gone.
    pub fn join_all(&self, label: &str) {
        if self.is_worker(thread::current().id()) {
            tracing::debug!(label, "teardown from inside a callback, workers left for the next join");
            return;
        }

        let _teardown = self.teardown.lock();
        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if worker.thread.join().is_err() {
                tracing::error!(label, worker = worker.id, "worker thread panicked");
            }
        }
    }

    /// Join every worker except the calling one, which is detached.
    ///
    /// Only for the final release of the pool, when no other caller can
    /// still reach it.
    pub fn join_except_current(&mut self, label: &str) {
        let current = thread::current().id();
        for worker in self.workers.get_mut().drain(..) {
            if worker.thread.thread().id() == current {
                tracing::debug!(label, worker = worker.id, "scheduler released by its own worker, detaching it");
                continue;
            }
            if worker.thread.join().is_err() {
                tracing::error!(label, worker = worker.id, "worker thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.len())
            .finish()
    }
}
