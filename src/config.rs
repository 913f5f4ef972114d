use crate::error::{Error, Result};
use crate::executor::PanicStrategy;
use std::time::Duration;

/// Longest label kept, in bytes. Longer labels are truncated.
pub const LABEL_MAX_LEN: usize = 15;

/// How the scheduler reacts when a synchronization step does not go as expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Log the failure and keep going.
    Lenient,
    /// Surface the failure to the caller, or stop the affected worker.
    Strict,
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        ErrorPolicy::Lenient
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub capacity: usize,
    pub num_threads: Option<usize>,
    pub label: String,
    pub thread_name_prefix: Option<String>,
    pub stack_size: Option<usize>,
    pub error_policy: ErrorPolicy,
    pub panic_strategy: PanicStrategy,
    pub diagnostics_interval: Duration,

    #[cfg(test)]
    pub(crate) fail_spawn_at: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: 1024,
            num_threads: None,
            label: "sched".to_string(),
            thread_name_prefix: None,
            stack_size: Some(2 * 1024 * 1024),
            error_policy: ErrorPolicy::default(),
            panic_strategy: PanicStrategy::default(),
            diagnostics_interval: Duration::from_secs(30),

            #[cfg(test)]
            fail_spawn_at: None,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::config("capacity must be > 0"));
        }

        if self.num_threads == Some(0) {
            return Err(Error::config("num_threads must be > 0"));
        }

        if self.diagnostics_interval.is_zero() {
            return Err(Error::config("diagnostics_interval must be > 0"));
        }

        Ok(())
    }

    pub fn worker_threads(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get)
    }

    /// The label as the scheduler will store it.
    pub fn truncated_label(&self) -> String {
        truncate_label(&self.label)
    }

    pub fn thread_name(&self, index: usize) -> String {
        match &self.thread_name_prefix {
            Some(prefix) => format!("{}-{}", prefix, index),
            None => format!("{}-{}", self.truncated_label(), index),
        }
    }
}

pub(crate) fn truncate_label(label: &str) -> String {
    if label.len() <= LABEL_MAX_LEN {
        return label.to_string();
    }

    let mut end = LABEL_MAX_LEN;
    while !label.is_char_boundary(end) {
        end -= 1;
    }
    label[..end].to_string()
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.config.num_threads = Some(n);
        self
    }

    pub fn label<S: Into<String>>(mut self, label: S) -> Self {
        self.config.label = label.into();
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = Some(prefix.into());
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.config.error_policy = policy;
        self
    }

    pub fn panic_strategy(mut self, strategy: PanicStrategy) -> Self {
        self.config.panic_strategy = strategy;
        self
    }

    pub fn diagnostics_interval(mut self, interval: Duration) -> Self {
        self.config.diagnostics_interval = interval;
        self
    }

    #[cfg(test)]
    pub(crate) fn fail_spawn_at(mut self, index: usize) -> Self {
        self.config.fail_spawn_at = Some(index);
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
