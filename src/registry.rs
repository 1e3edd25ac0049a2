//! Scheduler registry: per-priority counters and the scheduler factory.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::executor::{SerialQueue, Timer};
use crate::scheduler::{ObservedScheduler, Priority};
use crate::telemetry::{ElapsedProbe, MetricProbe, MetricSink, Metrics};
use crate::util::Counter;
use parking_lot::{Mutex, RwLock};
use std::sync::{Arc, OnceLock};

/// Owns the counters shared by every scheduler of one priority, the timer
/// thread, and the single UI thread.
///
/// Registries are built explicitly and passed to whoever needs schedulers.
/// An application that wants one process-wide instance installs it with
/// [`install_global`].
pub struct SchedulerRegistry {
    config: Config,
    counters: [OnceLock<Arc<Counter>>; Priority::COUNT],
    insert_lock: Mutex<()>,
    timer: Arc<Timer>,
    ui_queue: Arc<SerialQueue>,
    metrics: Arc<Metrics>,
}

impl SchedulerRegistry {
    pub fn new(config: Config) -> Result<Arc<Self>> {
        config.validate()?;

        let timer = Timer::new(&config)?;
        let ui_queue = SerialQueue::new(&config, format!("{}.ui", config.thread_name_prefix), 0)?;

        tracing::debug!(prefix = %config.thread_name_prefix, "scheduler registry created");

        Ok(Arc::new(Self {
            config,
            counters: Default::default(),
            insert_lock: Mutex::new(()),
            timer: Arc::new(timer),
            ui_queue: Arc::new(ui_queue),
            metrics: Arc::new(Metrics::new()),
        }))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Serial scheduler for `priority`, or the UI scheduler for
    /// [`Priority::Ui`] (runs inline when called from the UI thread).
    ///
    /// Each call builds a new scheduler; keep it around on hot paths.
    pub fn scheduler(self: &Arc<Self>, priority: Priority) -> Result<ObservedScheduler> {
        self.scheduler_with_sink::<ElapsedProbe>(priority, self.metrics.clone())
    }

    /// Concurrent scheduler for `priority`, or the UI scheduler for
    /// [`Priority::Ui`] (always enqueues).
    pub fn async_scheduler(self: &Arc<Self>, priority: Priority) -> Result<ObservedScheduler> {
        self.async_scheduler_with_sink::<ElapsedProbe>(priority, self.metrics.clone())
    }

    /// [`scheduler`](SchedulerRegistry::scheduler) with a custom probe kind and sink.
    pub fn scheduler_with_sink<P: MetricProbe>(
        self: &Arc<Self>,
        priority: Priority,
        sink: Arc<dyn MetricSink<P::Output>>,
    ) -> Result<ObservedScheduler<P>> {
        match priority.weight_class() {
            Some(_) => ObservedScheduler::serial(self, priority, sink),
            None => Ok(ObservedScheduler::ui(self, true, sink)),
        }
    }

    /// [`async_scheduler`](SchedulerRegistry::async_scheduler) with a custom
    /// probe kind and sink.
    pub fn async_scheduler_with_sink<P: MetricProbe>(
        self: &Arc<Self>,
        priority: Priority,
        sink: Arc<dyn MetricSink<P::Output>>,
    ) -> Result<ObservedScheduler<P>> {
        match priority.weight_class() {
            Some(_) => ObservedScheduler::concurrent(self, priority, sink),
            None => Ok(ObservedScheduler::ui(self, false, sink)),
        }
    }

    /// The counter for `priority`, created on first request.
    pub fn counter(&self, priority: Priority) -> Arc<Counter> {
        Arc::clone(self.slot(priority))
    }

    pub(crate) fn advance(&self, priority: Priority) -> u64 {
        self.slot(priority).advance()
    }

    fn slot(&self, priority: Priority) -> &Arc<Counter> {
        let cell = &self.counters[priority.index()];
        if let Some(counter) = cell.get() {
            return counter;
        }

        let _guard = self.insert_lock.lock();
        cell.get_or_init(|| {
            tracing::debug!(%priority, "priority counter created");
            Arc::new(Counter::new())
        })
    }

    /// Current value of every counter created so far.
    pub fn counters(&self) -> Vec<(Priority, u64)> {
        Priority::ALL
            .into_iter()
            .filter_map(|p| self.counters[p.index()].get().map(|c| (p, c.value())))
            .collect()
    }

    /// Default sink of the schedulers handed out by this registry.
    pub fn metrics(&self) -> Arc<Metrics> {
        self.metrics.clone()
    }

    pub(crate) fn timer(&self) -> Arc<Timer> {
        self.timer.clone()
    }

    pub(crate) fn ui_queue(&self) -> Arc<SerialQueue> {
        self.ui_queue.clone()
    }

    /// Whether the caller is running on this registry's UI thread.
    pub fn is_ui_thread(&self) -> bool {
        self.ui_queue.is_current()
    }
}

impl std::fmt::Debug for SchedulerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchedulerRegistry")
            .field("config", &self.config)
            .field("counters", &self.counters())
            .field("timer", &self.timer)
            .finish()
    }
}

// Process-wide default registry, installed by the application
static GLOBAL_REGISTRY: RwLock<Option<Arc<SchedulerRegistry>>> = RwLock::new(None);

pub fn install_global(registry: Arc<SchedulerRegistry>) -> Result<()> {
    let mut global = GLOBAL_REGISTRY.write();
    if global.is_some() {
        return Err(Error::AlreadyInitialized);
    }
    *global = Some(registry);
    Ok(())
}

pub fn global() -> Result<Arc<SchedulerRegistry>> {
    GLOBAL_REGISTRY.read().clone().ok_or(Error::NotInitialized)
}

/// Remove the process-wide registry, returning it.
pub fn uninstall_global() -> Option<Arc<SchedulerRegistry>> {
    GLOBAL_REGISTRY.write().take()
}
