//! Measurement probes wrapped around every observed task.
//!
//! A probe starts measuring when it is constructed and produces its
//! measurement when finished. The observation hook is generic over the
//! probe kind, so swapping [`ElapsedProbe`] for [`RecordProbe`] changes what
//! the sink receives without touching the schedulers.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub trait MetricProbe: Send + 'static {
    type Output: Send + 'static;

    /// Begin measuring.
    fn start() -> Self;

    /// Measurement since [`start`](MetricProbe::start). Calling it again
    /// measures again from the same start.
    fn finish(&self) -> Self::Output;
}

/// Anything that carries the elapsed execution time of a task.
pub trait Measurement {
    fn elapsed(&self) -> Duration;
}

impl Measurement for Duration {
    fn elapsed(&self) -> Duration {
        *self
    }
}

/// Default probe: monotonic wall-clock time spent in the task.
#[derive(Debug, Clone, Copy)]
pub struct ElapsedProbe {
    start: Instant,
}

impl MetricProbe for ElapsedProbe {
    type Output = Duration;

    fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    fn finish(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Probe producing a serializable [`TaskRecord`] per execution.
#[derive(Debug, Clone)]
pub struct RecordProbe {
    start: Instant,
    started_at: SystemTime,
    thread: Option<String>,
}

impl MetricProbe for RecordProbe {
    type Output = TaskRecord;

    fn start() -> Self {
        Self {
            start: Instant::now(),
            started_at: SystemTime::now(),
            thread: std::thread::current().name().map(str::to_string),
        }
    }

    fn finish(&self) -> TaskRecord {
        let started_at_us = self
            .started_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);

        TaskRecord {
            started_at_us,
            elapsed_ns: self.start.elapsed().as_nanos() as u64,
            thread: self.thread.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Wall-clock start, microseconds since the UNIX epoch.
    pub started_at_us: u64,
    pub elapsed_ns: u64,
    pub thread: Option<String>,
}

impl Measurement for TaskRecord {
    fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns)
    }
}
