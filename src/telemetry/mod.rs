//! Observability for the scheduler.
//!
//! Counters live in [`metrics`]; the timer-driven queue sampler lives in
//! [`diagnostics`].

pub mod diagnostics;
pub mod metrics;

pub(crate) use diagnostics::Diagnostics;
pub use diagnostics::QueueStatus;
pub use metrics::{Metrics, MetricsSnapshot};
