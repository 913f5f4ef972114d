//! Task execution infrastructure.
//!
//! This module provides the bounded slot ring, the queue built on top of it,
//! the worker loop, and the fixed worker pool that services the queue.

pub(crate) mod panic_handler;
pub(crate) mod pool;
pub(crate) mod queue;
pub(crate) mod ring;
pub mod task;
pub(crate) mod worker;

pub use panic_handler::PanicStrategy;
pub use queue::SubmitStatus;
pub use task::{Callback, Handle, Task, TaskId};
