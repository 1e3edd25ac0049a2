use super::task::Task;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicStrategy {
    Abort,
    LogAndContinue,
}

impl Default for PanicStrategy {
    fn default() -> Self {
        PanicStrategy::LogAndContinue
    }
}

/// Runs tasks on a worker thread so that a panicking task never takes the worker down.
#[derive(Debug)]
pub struct PanicHandler {
    strategy: PanicStrategy,
    panic_count: AtomicUsize,
}

impl PanicHandler {
    pub fn new(strategy: PanicStrategy) -> Self {
        Self {
            strategy,
            panic_count: AtomicUsize::new(0),
        }
    }

    pub fn run(&self, task: Task) {
        let id = task.id;
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| task.execute())) {
            self.panic_count.fetch_add(1, Ordering::Relaxed);
            let message = panic_message(payload.as_ref());

            match self.strategy {
                PanicStrategy::Abort => {
                    tracing::error!(task = ?id, %message, "task panicked, aborting");
                    std::process::abort();
                }
                PanicStrategy::LogAndContinue => {
                    tracing::error!(task = ?id, %message, "task panicked");
                }
            }
        }
    }

    pub fn panic_count(&self) -> usize {
        self.panic_count.load(Ordering::Relaxed)
    }
}

impl Default for PanicHandler {
    fn default() -> Self {
        Self::new(PanicStrategy::default())
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
