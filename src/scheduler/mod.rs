//! Observed scheduling subsystem.
//!
//! A scheduler is bound to one [`Priority`] and wraps an execution queue.
//! Every task it runs, whether submitted for immediate, delayed or periodic
//! execution, goes through the same observation hook: the registry counter
//! for the priority is advanced, a probe times the task, and the measurement
//! is handed to the scheduler's sink.

pub mod handle;
pub(crate) mod hook;
pub mod observed;
pub(crate) mod periodic;
pub mod priority;

pub use handle::{CancellationHandle, TaskHandle};
pub use observed::ObservedScheduler;
pub use priority::{Priority, WeightClass};

pub use crate::executor::QueueKind;
