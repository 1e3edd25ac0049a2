//! Per-priority execution metrics, the registry's default sink.

use super::probe::Measurement;
use super::sink::{MetricSink, Outcome};
use crate::scheduler::Priority;
use hdrhistogram::Histogram;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct PriorityStats {
    tasks_executed: AtomicU64,
    tasks_panicked: AtomicU64,
    busy_time_ns: AtomicU64,
    // Latency histogram (protected by RwLock for interior mutability)
    latency_histogram: RwLock<Histogram<u64>>,
}

impl PriorityStats {
    fn new() -> Self {
        // 3 significant figures, max value of 1 hour in nanoseconds
        let histogram = Histogram::new_with_max(3_600_000_000_000, 3)
            .expect("histogram bounds are valid");

        Self {
            tasks_executed: AtomicU64::new(0),
            tasks_panicked: AtomicU64::new(0),
            busy_time_ns: AtomicU64::new(0),
            latency_histogram: RwLock::new(histogram),
        }
    }
}

/// Latency and volume per priority.
#[derive(Debug)]
pub struct Metrics {
    stats: [PriorityStats; Priority::COUNT],
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            stats: std::array::from_fn(|_| PriorityStats::new()),
            start_time: Instant::now(),
        }
    }

    /// Record one task execution of `duration_ns` at `priority`.
    pub fn record_task_execution(&self, priority: Priority, duration_ns: u64, outcome: Outcome) {
        let stats = &self.stats[priority.index()];
        stats.tasks_executed.fetch_add(1, Ordering::Relaxed);
        stats.busy_time_ns.fetch_add(duration_ns, Ordering::Relaxed);
        if outcome == Outcome::Panicked {
            stats.tasks_panicked.fetch_add(1, Ordering::Relaxed);
        }

        stats.latency_histogram.write().saturating_record(duration_ns);
    }

    pub fn snapshot(&self, priority: Priority) -> PriorityMetrics {
        let stats = &self.stats[priority.index()];
        let histogram = stats.latency_histogram.read();

        PriorityMetrics {
            priority,
            tasks_executed: stats.tasks_executed.load(Ordering::Relaxed),
            tasks_panicked: stats.tasks_panicked.load(Ordering::Relaxed),
            busy_time_ns: stats.busy_time_ns.load(Ordering::Relaxed),
            avg_latency_ns: if histogram.len() > 0 {
                histogram.mean() as u64
            } else {
                0
            },
            p50_latency_ns: histogram.value_at_quantile(0.50),
            p95_latency_ns: histogram.value_at_quantile(0.95),
            p99_latency_ns: histogram.value_at_quantile(0.99),
            max_latency_ns: histogram.max(),
        }
    }

    /// Snapshot of every priority that has executed at least one task.
    pub fn snapshot_all(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime: self.start_time.elapsed(),
            priorities: Priority::ALL
                .into_iter()
                .map(|p| self.snapshot(p))
                .filter(|m| m.tasks_executed > 0)
                .collect(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Measurement> MetricSink<M> for Metrics {
    fn record(&self, priority: Priority, outcome: Outcome, measurement: &M) {
        let elapsed = measurement.elapsed();
        self.record_task_execution(priority, elapsed.as_nanos() as u64, outcome);
        tracing::trace!(%priority, ?outcome, elapsed_us = elapsed.as_micros() as u64, "task observed");
    }
}

#[derive(Debug, Clone, PartialEq)]
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

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub uptime: Duration,
    pub priorities: Vec<PriorityMetrics>,
}

impl MetricsSnapshot {
    pub fn get(&self, priority: Priority) -> Option<&PriorityMetrics> {
        self.priorities.iter().find(|m| m.priority == priority)
    }

    pub fn total_executed(&self) -> u64 {
        self.priorities.iter().map(|m| m.tasks_executed).sum()
    }

    /// Calculate tasks per second
    pub fn tasks_per_second(&self) -> f64 {
        let seconds = self.uptime.as_secs_f64();
        if seconds == 0.0 {
            return 0.0;
        }
        self.total_executed() as f64 / seconds
    }
}
