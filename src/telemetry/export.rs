//! Metrics export functionality for various formats.

use super::metrics::{MetricsSnapshot, PriorityMetrics};
use crate::error::{Error, Result};
use crate::scheduler::Priority;
use serde::Serialize;

/// Trait for exporting metrics to different formats
pub trait MetricsExporter: Send + Sync {
    /// Export a metrics snapshot
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()>;
}

/// Export metrics to a pretty-printed JSON file
pub struct JsonExporter {
    output_path: std::path::PathBuf,
}

impl JsonExporter {
    pub fn new(output_path: impl Into<std::path::PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }
}

impl MetricsExporter for JsonExporter {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        let serializable = SerializableSnapshot::from(snapshot);
        let json = serde_json::to_string_pretty(&serializable)
            .map_err(|e| Error::telemetry(format!("JSON serialization failed: {}", e)))?;

        std::fs::write(&self.output_path, json)
            .map_err(|e| Error::telemetry(format!("failed to write file: {}", e)))?;

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
struct SerializableSnapshot {
    uptime_secs: f64,
    tasks_per_second: f64,
    priorities: Vec<SerializablePriority>,
}

#[derive(Debug, Clone, Serialize)]
struct SerializablePriority {
    priority: Priority,
    tasks_executed: u64,
    tasks_panicked: u64,
    busy_time_ms: u64,
    avg_latency_us: f64,
    p50_latency_us: f64,
    p95_latency_us: f64,
    p99_latency_us: f64,
    max_latency_us: f64,
}

impl From<&PriorityMetrics> for SerializablePriority {
    fn from(m: &PriorityMetrics) -> Self {
        Self {
            priority: m.priority,
            tasks_executed: m.tasks_executed,
            tasks_panicked: m.tasks_panicked,
            busy_time_ms: m.busy_time_ns / 1_000_000,
            avg_latency_us: m.avg_latency_ns as f64 / 1_000.0,
            p50_latency_us: m.p50_latency_ns as f64 / 1_000.0,
            p95_latency_us: m.p95_latency_ns as f64 / 1_000.0,
            p99_latency_us: m.p99_latency_ns as f64 / 1_000.0,
            max_latency_us: m.max_latency_ns as f64 / 1_000.0,
        }
    }
}

impl From<&MetricsSnapshot> for SerializableSnapshot {
    fn from(snapshot: &MetricsSnapshot) -> Self {
        Self {
            uptime_secs: snapshot.uptime.as_secs_f64(),
            tasks_per_second: snapshot.tasks_per_second(),
            priorities: snapshot.priorities.iter().map(SerializablePriority::from).collect(),
        }
    }
}

/// Export metrics as `tracing` events, one per priority.
#[derive(Debug, Default)]
pub struct LogExporter;

impl MetricsExporter for LogExporter {
    fn export(&self, snapshot: &MetricsSnapshot) -> Result<()> {
        for m in &snapshot.priorities {
            tracing::info!(
                priority = %m.priority,
                executed = m.tasks_executed,
                panicked = m.tasks_panicked,
                p50_us = m.p50_latency_ns / 1_000,
                p99_us = m.p99_latency_ns / 1_000,
                "scheduler metrics"
            );
        }
        Ok(())
    }
}
