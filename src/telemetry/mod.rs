//! Measurement and reporting of observed task executions.
//!
//! Probes measure a single execution, sinks receive the measurements, and
//! the metrics collector aggregates them per priority for export.

pub mod probe;
pub mod sink;

#[cfg(feature = "telemetry")]
pub mod metrics;

#[cfg(feature = "telemetry")]
pub mod export;

pub use metrics::{Metrics, MetricsSnapshot, PriorityMetrics};
pub use probe::{ElapsedProbe, Measurement, MetricProbe, RecordProbe, TaskRecord};
pub use sink::{LogSink, MetricSink, ObservedRecord, Outcome, RecordBuffer};

#[cfg(feature = "telemetry")]
pub use export::{JsonExporter, LogExporter, MetricsExporter};

// Stub implementations when telemetry is disabled
#[cfg(not(feature = "telemetry"))]
pub mod metrics {
    use super::sink::{MetricSink, Outcome};
    use crate::scheduler::Priority;
    use std::time::Duration;

    #[derive(Debug, Clone, Default)]
    pub struct Metrics;

    impl Metrics {
        pub fn new() -> Self {
            Self
        }
        pub fn record_task_execution(&self, _: Priority, _: u64, _: Outcome) {}
        pub fn snapshot(&self, priority: Priority) -> PriorityMetrics {
            PriorityMetrics {
                priority,
                ..PriorityMetrics::default()
            }
        }
        pub fn snapshot_all(&self) -> MetricsSnapshot {
            MetricsSnapshot::default()
        }
    }

    impl<M> MetricSink<M> for Metrics {
        fn record(&self, _: Priority, _: Outcome, _: &M) {}
    }

    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct PriorityMetrics {
        pub priority: Priority,
        pub tasks_executed: u64,
        pub tasks_panicked: u64,
        pub busy_time_ns: u64,
        pub avg_latency_ns: u64,
        pub p50_latency_ns: u64,
        pub p95_latency_ns: u64,
        pub p99_latency_ns: u64,
        pub max_latency_ns: u64,
    }

    #[derive(Debug, Clone, Default)]
    pub struct MetricsSnapshot {
        pub uptime: Duration,
        pub priorities: Vec<PriorityMetrics>,
    }
}
