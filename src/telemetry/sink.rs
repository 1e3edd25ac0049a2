//! Destinations for task measurements.

use super::probe::TaskRecord;
use crate::error::{Error, Result};
use crate::scheduler::Priority;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;

/// How an observed task left its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Completed,
    Panicked,
}

/// Receives one measurement per observed task execution.
///
/// Called on the thread that ran the task, after the task body returned or
/// while it is unwinding. Implementations must not panic.
pub trait MetricSink<M>: Send + Sync {
    fn record(&self, priority: Priority, outcome: Outcome, measurement: &M);
}

/// Emits a `tracing` event per task.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl<M: fmt::Debug> MetricSink<M> for LogSink {
    fn record(&self, priority: Priority, outcome: Outcome, measurement: &M) {
        tracing::debug!(%priority, ?outcome, ?measurement, "task observed");
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedRecord {
    pub priority: Priority,
    pub outcome: Outcome,
    #[serde(flatten)]
    pub record: TaskRecord,
}

/// Collects [`TaskRecord`]s in memory for later export.
#[derive(Debug, Default)]
pub struct RecordBuffer {
    records: Mutex<Vec<ObservedRecord>>,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn records(&self) -> Vec<ObservedRecord> {
        self.records.lock().clone()
    }

    pub fn drain(&self) -> Vec<ObservedRecord> {
        std::mem::take(&mut *self.records.lock())
    }

    /// Append every buffered record to `path` as one JSON object per line,
    /// then clear the buffer.
    pub fn write_json_lines(&self, path: impl AsRef<Path>) -> Result<usize> {
        let records = self.drain();
        let mut out = Vec::new();
        for record in &records {
            serde_json::to_writer(&mut out, record)
                .map_err(|e| Error::telemetry(format!("JSON serialization failed: {}", e)))?;
            out.push(b'\n');
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        file.write_all(&out)?;

        Ok(records.len())
    }
}

impl MetricSink<TaskRecord> for RecordBuffer {
    fn record(&self, priority: Priority, outcome: Outcome, measurement: &TaskRecord) {
        self.records.lock().push(ObservedRecord {
            priority,
            outcome,
            record: measurement.clone(),
        });
    }
}
