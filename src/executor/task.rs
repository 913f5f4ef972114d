//! Task representation and dispatch.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Global task ID counter
static TASK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque value carried by a task. The scheduler only moves it around.
pub type Handle = Arc<dyn Any + Send + Sync>;

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(TASK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// The work a task performs once a worker claims it.
pub enum Callback {
    /// Called with the task itself, so it can read its payload.
    Single(Box<dyn FnOnce(&Task) + Send + 'static>),
    /// Called with the task's `handle` and `timer_handle`.
    Pair(Box<dyn FnOnce(Option<Handle>, Option<Handle>) + Send + 'static>),
    /// Nothing to run. Discarded on dispatch.
    Unset,
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Callback::Single(_) => f.write_str("Single"),
            Callback::Pair(_) => f.write_str("Pair"),
            Callback::Unset => f.write_str("Unset"),
        }
    }
}

/// Result of handing a task to its callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
    Ran,
    Discarded,
}

/// One unit of deferred work.
pub struct Task {
    id: TaskId,
    callback: Callback,
    payload: Option<Handle>,
    handle: Option<Handle>,
    timer_handle: Option<Handle>,
}

impl Task {
    /// Create a task whose callback receives the task itself.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&Task) + Send + 'static,
    {
        Self::from_callback(Callback::Single(Box::new(f)))
    }

    /// Create a task whose callback receives `(handle, timer_handle)`.
    pub fn pair<F>(f: F, handle: Option<Handle>, timer_handle: Option<Handle>) -> Self
    where
        F: FnOnce(Option<Handle>, Option<Handle>) + Send + 'static,
    {
        let mut task = Self::from_callback(Callback::Pair(Box::new(f)));
        task.handle = handle;
        task.timer_handle = timer_handle;
        task
    }

    pub fn from_callback(callback: Callback) -> Self {
        Task {
            id: TaskId::next(),
            callback,
            payload: None,
            handle: None,
            timer_handle: None,
        }
    }

    /// Attach an opaque payload.
    pub fn with_payload<T>(mut self, payload: T) -> Self
    where
        T: Any + Send + Sync,
    {
        self.payload = Some(Arc::new(payload));
        self
    }

    pub fn with_handles(mut self, handle: Option<Handle>, timer_handle: Option<Handle>) -> Self {
        self.handle = handle;
        self.timer_handle = timer_handle;
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn payload(&self) -> Option<&Handle> {
        self.payload.as_ref()
    }

    /// Borrow the payload as a concrete type.
    pub fn payload_as<T: Any>(&self) -> Option<&T> {
        self.payload.as_deref().and_then(|p| p.downcast_ref::<T>())
    }

    pub fn handle(&self) -> Option<&Handle> {
        self.handle.as_ref()
    }

    pub fn timer_handle(&self) -> Option<&Handle> {
        self.timer_handle.as_ref()
    }

    /// Whether dispatch would invoke anything.
    pub fn is_runnable(&self) -> bool {
        !matches!(self.callback, Callback::Unset)
    }

    /// Run exactly one callback arm.
    pub(crate) fn dispatch(mut self) -> Dispatch {
        match std::mem::replace(&mut self.callback, Callback::Unset) {
            Callback::Single(f) => {
                f(&self);
                Dispatch::Ran
            }
            Callback::Pair(f) => {
                f(self.handle.take(), self.timer_handle.take());
                Dispatch::Ran
            }
            Callback::Unset => Dispatch::Discarded,
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("callback", &self.callback)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}
