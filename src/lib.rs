//! QueueCentre - priority-aware, observed execution contexts
//!
//! Application code asks a [`SchedulerRegistry`] for a scheduler at some
//! [`Priority`] and submits work to it. The registry routes each priority to
//! a serial or concurrent execution context of the matching weight class (or
//! to the single UI thread), and every task that runs is counted per priority
//! and timed, without instrumenting the call sites.
//!
//! # Quick Start
//!
//! ```no_run
//! use queue_centre::prelude::*;
//! use std::time::Duration;
//!
//! let registry = SchedulerRegistry::new(Config::default()).unwrap();
//! let scheduler = registry.scheduler(Priority::High).unwrap();
//!
//! let answer = scheduler.schedule(21, |x| x * 2).join().unwrap();
//! assert_eq!(answer, 42);
//!
//! let tick = scheduler.schedule_periodic(0u32, Duration::ZERO, Duration::from_millis(100), |n| n + 1);
//! tick.cancel();
//!
//! println!("high priority tasks: {}", registry.counter(Priority::High).value());
//! ```
//!
//! # Features
//!
//! - **Priority routing**: five weight classes plus a UI-confined context
//! - **Serial and concurrent contexts**: FIFO single-thread queues and
//!   work-stealing pools
//! - **Immediate, delayed and periodic scheduling** with best-effort
//!   cancellation and timer leeway
//! - **Per-priority counters**: lock-free, created once per registry
//! - **Pluggable probes and sinks**: elapsed time or serializable records
//! - **Telemetry**: latency histograms and exporters (feature `telemetry`)

// Lint configuration
#![warn(missing_debug_implementations)]

pub mod config;
pub mod error;
pub mod executor;
pub mod prelude;
pub mod registry;
pub mod scheduler;
pub mod telemetry;
pub mod util;

// Re-export key types at crate root
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use registry::{global, install_global, uninstall_global, SchedulerRegistry};
pub use scheduler::{CancellationHandle, ObservedScheduler, Priority, TaskHandle, WeightClass};
pub use util::Counter;
