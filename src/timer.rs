//! Timer service used to drive periodic diagnostics.
//!
//! Timers are one-shot: a callback that wants to run again arms a new timer
//! from inside itself. [`ThreadTimer`] runs every callback on one background
//! thread, in deadline order.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Identifies one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn from_raw(raw: u64) -> Self {
        TimerId(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Invoked once when the timer fires, with the id it was armed under.
pub type TimerCallback = Box<dyn FnOnce(TimerId) + Send + 'static>;

pub trait TimerService: Send + Sync {
    /// Schedule `callback` to run once after `interval`.
    ///
    /// Returns `None` if the service can no longer accept timers.
    fn arm(&self, interval: Duration, callback: TimerCallback) -> Option<TimerId>;

    /// Cancel a timer. Unknown or already fired ids are ignored.
    fn disarm(&self, id: TimerId);
}

enum Command {
    Arm {
        id: TimerId,
        deadline: Instant,
        callback: TimerCallback,
    },
    Disarm(TimerId),
    Shutdown,
}

/// Timer service backed by a dedicated thread.
pub struct ThreadTimer {
    tx: Sender<Command>,
    next_id: AtomicU64,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl ThreadTimer {
    pub fn new() -> std::io::Result<Self> {
        Self::with_name("sched-timer")
    }

    pub fn with_name<S: Into<String>>(name: S) -> std::io::Result<Self> {
        let (tx, rx) = unbounded();
        let thread = thread::Builder::new()
            .name(name.into())
            .spawn(move || run_timer(rx))?;

        Ok(Self {
            tx,
            next_id: AtomicU64::new(1),
            thread: Mutex::new(Some(thread)),
        })
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);

        if let Some(thread) = self.thread.lock().take() {
            // a callback may drop the last reference from the timer thread itself
            if thread.thread().id() == thread::current().id() {
                return;
            }
            if thread.join().is_err() {
                tracing::error!("timer thread panicked");
            }
        }
    }
}

impl TimerService for ThreadTimer {
    fn arm(&self, interval: Duration, callback: TimerCallback) -> Option<TimerId> {
        let id = TimerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let command = Command::Arm {
            id,
            deadline: Instant::now() + interval,
            callback,
        };
        self.tx.send(command).ok()?;
        Some(id)
    }

    fn disarm(&self, id: TimerId) {
        let _ = self.tx.send(Command::Disarm(id));
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ThreadTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadTimer")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn run_timer(rx: Receiver<Command>) {
    let mut deadlines: BinaryHeap<Reverse<(Instant, TimerId)>> = BinaryHeap::new();
    let mut callbacks: HashMap<TimerId, TimerCallback> = HashMap::new();

    loop {
        let command = match deadlines.peek() {
            Some(Reverse((deadline, _))) => match rx.recv_deadline(*deadline) {
                Ok(command) => Some(command),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => return,
            },
            None => match rx.recv() {
                Ok(command) => Some(command),
                Err(_) => return,
            },
        };

        match command {
            Some(Command::Arm {
                id,
                deadline,
                callback,
            }) => {
                deadlines.push(Reverse((deadline, id)));
                callbacks.insert(id, callback);
            }
            Some(Command::Disarm(id)) => {
                // heap entry stays behind and is skipped when it comes due
                callbacks.remove(&id);
            }
            Some(Command::Shutdown) => return,
            None => {}
        }

        let now = Instant::now();
        while let Some(Reverse((deadline, id))) = deadlines.peek().copied() {
            if deadline > now {
                break;
            }
            deadlines.pop();
            if let Some(callback) = callbacks.remove(&id) {
                callback(id);
            }
        }
    }
}
