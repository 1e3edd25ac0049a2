//! Execution mechanisms behind observed schedulers.
//!
//! Every queue accepts boxed [`Task`]s and runs them on threads it owns:
//! a single FIFO thread for [`SerialQueue`], a work-stealing pool for
//! [`ConcurrentQueue`], and the registry's one designated thread for
//! [`UiQueue`]. Delayed work goes through the registry's [`Timer`], which
//! hands tasks to a queue once they are due.

pub mod concurrent;
pub mod panic_handler;
pub mod serial;
pub mod task;
pub mod timer;
pub mod ui;
pub(crate) mod worker;

pub use concurrent::ConcurrentQueue;
pub use panic_handler::{PanicHandler, PanicStrategy};
pub use serial::SerialQueue;
pub use task::{Task, TaskId};
pub use timer::Timer;
pub use ui::UiQueue;

use std::fmt;

/// Shape of the mechanism a scheduler submits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {
    Serial,
    Concurrent,
    Ui,
}

impl fmt::Display for QueueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueueKind::Serial => "serial",
            QueueKind::Concurrent => "concurrent",
            QueueKind::Ui => "ui",
        };
        f.write_str(name)
    }
}

/// A target that runs submitted tasks on threads it owns.
pub trait ExecutionQueue: Send + Sync + fmt::Debug {
    fn submit(&self, task: Task);

    fn kind(&self) -> QueueKind;

    fn label(&self) -> &str;

    /// Tasks submitted but not yet picked up by a thread.
    fn pending(&self) -> usize;

    fn panic_count(&self) -> usize;
}
