use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// What a worker does when a callback panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanicStrategy {
    /// Abort the process.
    Abort,
    /// Keep the worker alive without logging.
    Isolate,
    /// Log the panic at `error` and keep the worker alive.
    #[default]
    LogAndContinue,
}

/// Runs callbacks for one queue, applying its [`PanicStrategy`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct PanicHandler {
    strategy: PanicStrategy,
}

impl PanicHandler {
    pub fn new(strategy: PanicStrategy) -> Self {
        Self { strategy }
    }

    /// Run `f`; a panic is turned into its message, or aborts the process.
    pub fn run<R>(&self, label: &str, f: impl FnOnce() -> R) -> Result<R, String> {
        let payload = match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => return Ok(value),
            Err(payload) => payload,
        };

        let message = panic_message(payload.as_ref());
        match self.strategy {
            PanicStrategy::Abort => {
                tracing::error!(label, %message, "callback panicked, aborting");
                std::process::abort();
            }
            PanicStrategy::Isolate => {}
            PanicStrategy::LogAndContinue => {
                tracing::error!(label, %message, "callback panicked");
            }
        }
        Err(message)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
