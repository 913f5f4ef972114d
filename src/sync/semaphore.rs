//! Counting semaphore with close support.
//!
//! Built on a `parking_lot` mutex/condvar pair. Closing wakes every waiter;
//! a closed semaphore refuses further acquisitions even if permits remain.

use parking_lot::{Condvar, Mutex};

/// Why an acquisition did not take a permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireError {
    /// The semaphore was closed before or while waiting.
    Closed,
}

#[derive(Debug)]
struct State {
    permits: usize,
    closed: bool,
}

#[derive(Debug)]
pub struct Semaphore {
    state: Mutex<State>,
    available: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            state: Mutex::new(State {
                permits,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Take one permit, blocking until one is released or the semaphore closes.
    ///
    /// Spurious wake-ups are absorbed here and never reach the caller.
    pub fn acquire(&self) -> Result<(), AcquireError> {
        let mut state = self.state.lock();
        loop {
            if state.closed {
                return Err(AcquireError::Closed);
            }
            if state.permits > 0 {
                state.permits -= 1;
                return Ok(());
            }
            self.available.wait(&mut state);
        }
    }

    /// Return one permit and wake a single waiter.
    pub fn release(&self) {
        let mut state = self.state.lock();
        state.permits += 1;
        drop(state);
        self.available.notify_one();
    }

    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        drop(state);
        self.available.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn available_permits(&self) -> usize {
        self.state.lock().permits
    }
}
