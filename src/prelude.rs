pub use crate::config::{Config, ConfigBuilder, ErrorPolicy};
pub use crate::error::{Error, Result};
pub use crate::executor::{PanicStrategy, SubmitStatus, Task};
pub use crate::scheduler::Scheduler;
pub use crate::telemetry::QueueStatus;
pub use crate::timer::{ThreadTimer, TimerService};
pub use crate::{create, destroy, submit};
