// worker thread stuff
use super::queue::{Claim, TaskQueue};
use crate::config::ErrorPolicy;
use std::sync::Arc;

pub type WorkerId = usize;

pub(crate) struct Worker {
    pub id: WorkerId,
    queue: Arc<TaskQueue>,
}

impl Worker {
    pub fn new(id: WorkerId, queue: Arc<TaskQueue>) -> Self {
        Self { id, queue }
    }

    // main loop: wait for a filled slot, claim it, dispatch outside the guard
    pub fn run(&self) {
        let label = self.queue.label();
        tracing::trace!(label, worker = self.id, "worker started");

        loop {
            if self.queue.is_stopping() {
                break;
            }

            match self.queue.claim() {
                Claim::Task(task) => self.queue.dispatch(task),
                Claim::Empty => match self.queue.error_policy() {
                    ErrorPolicy::Lenient => {
                        tracing::error!(label, worker = self.id, "claimed an empty slot");
                    }
                    ErrorPolicy::Strict => {
                        tracing::error!(label, worker = self.id, "claimed an empty slot, worker stopping");
                        break;
                    }
                },
                Claim::Closed => break,
            }
        }

        tracing::trace!(label, worker = self.id, "worker stopped");
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("label", &self.queue.label())
            .finish()
    }
}
