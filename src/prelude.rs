pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::executor::{PanicStrategy, QueueKind};
pub use crate::registry::SchedulerRegistry;
pub use crate::scheduler::{CancellationHandle, ObservedScheduler, Priority, TaskHandle, WeightClass};
pub use crate::telemetry::{ElapsedProbe, MetricProbe, MetricSink, Outcome, RecordProbe};
pub use crate::util::Counter;

#[cfg(feature = "telemetry")]
pub use crate::telemetry::{Metrics, MetricsSnapshot};
