use crate::error::{Error, Result};
use crate::executor::PanicStrategy;
use std::time::Duration;

const MAX_WORKER_THREADS: usize = 1024;
const MAX_LEEWAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Config {
    pub worker_threads: Option<usize>,
    pub leeway: Duration,
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
    pub adjust_thread_priority: bool,
    pub scale_by_weight: bool,
    pub panic_strategy: PanicStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_threads: None,
            leeway: Duration::ZERO,
            thread_name_prefix: "qc".to_string(),
            stack_size: Some(2 * 1024 * 1024),
            adjust_thread_priority: true,
            scale_by_weight: true,
            panic_strategy: PanicStrategy::default(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.worker_threads {
            if n == 0 {
                return Err(Error::config("worker_threads must be > 0"));
            }
            if n > MAX_WORKER_THREADS {
                return Err(Error::config("worker_threads too large (max 1024)"));
            }
        }

        if self.leeway > MAX_LEEWAY {
            return Err(Error::config("leeway must not exceed 1s"));
        }

        if self.thread_name_prefix.is_empty() {
            return Err(Error::config("thread_name_prefix must not be empty"));
        }

        Ok(())
    }

    /// Width of a concurrent context before weight-class scaling.
    pub fn worker_threads(&self) -> usize {
        self.worker_threads.unwrap_or_else(num_cpus::get)
    }
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

    pub fn worker_threads(mut self, n: usize) -> Self {
        self.config.worker_threads = Some(n);
        self
    }

    pub fn leeway(mut self, leeway: Duration) -> Self {
        self.config.leeway = leeway;
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn adjust_thread_priority(mut self, adjust: bool) -> Self {
        self.config.adjust_thread_priority = adjust;
        self
    }

    pub fn scale_by_weight(mut self, scale: bool) -> Self {
        self.config.scale_by_weight = scale;
        self
    }

    pub fn panic_strategy(mut self, strategy: PanicStrategy) -> Self {
        self.config.panic_strategy = strategy;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
