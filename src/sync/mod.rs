//! Blocking synchronization primitives used by the scheduler.

pub mod semaphore;

pub use semaphore::{AcquireError, Semaphore};
