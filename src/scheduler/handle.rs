use crate::error::{Error, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a one-shot task sends back: its value, or the message it panicked with.
pub(crate) type TaskOutcome<R> = std::result::Result<R, String>;

/// Best-effort cancellation token.
///
/// Cancelling prevents work that has not started yet from starting; work
/// that is already running is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Handle to a one-shot scheduled task and its eventual result.
#[must_use = "dropping a TaskHandle does not cancel the task"]
#[derive(Debug)]
pub struct TaskHandle<R> {
    cancellation: CancellationHandle,
    result: Receiver<TaskOutcome<R>>,
}

impl<R> TaskHandle<R> {
    pub(crate) fn new(cancellation: CancellationHandle, result: Receiver<TaskOutcome<R>>) -> Self {
        Self {
            cancellation,
            result,
        }
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancellation(&self) -> CancellationHandle {
        self.cancellation.clone()
    }

    /// Whether the task has finished and its result is waiting.
    pub fn is_finished(&self) -> bool {
        !self.result.is_empty()
    }

    /// Block until the task has run and return what its action returned.
    pub fn join(self) -> Result<R> {
        match self.result.recv() {
            Ok(outcome) => unpack(outcome),
            Err(_) => Err(self.not_run()),
        }
    }

    /// Like [`join`](TaskHandle::join) but gives up after `timeout`; the
    /// handle stays usable after [`Error::Timeout`].
    pub fn join_timeout(&self, timeout: Duration) -> Result<R> {
        match self.result.recv_timeout(timeout) {
            Ok(outcome) => unpack(outcome),
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(self.not_run()),
        }
    }

    fn not_run(&self) -> Error {
        if self.is_cancelled() {
            Error::Cancelled
        } else {
            Error::executor("task dropped before it ran")
        }
    }
}

fn unpack<R>(outcome: TaskOutcome<R>) -> Result<R> {
    outcome.map_err(Error::TaskPanicked)
}
