use super::handle::{CancellationHandle, TaskHandle};
use super::hook::ObservationHook;
use super::periodic::PeriodicJob;
use super::priority::{Priority, WeightClass};
use crate::error::Result;
use crate::executor::panic_handler::panic_message;
use crate::executor::{ConcurrentQueue, ExecutionQueue, QueueKind, SerialQueue, Task, Timer, UiQueue};
use crate::registry::SchedulerRegistry;
use crate::telemetry::{ElapsedProbe, MetricProbe, MetricSink};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

/// Execution context bound to one priority that counts and times every task
/// it runs.
///
/// Obtained from [`SchedulerRegistry::scheduler`] (serial) or
/// [`SchedulerRegistry::async_scheduler`] (concurrent), or built directly with
/// [`serial`](ObservedScheduler::serial) / [`concurrent`](ObservedScheduler::concurrent)
/// to pick a different probe kind or sink.
///
/// The scheduler exclusively owns its execution queue. Dropping it detaches
/// the observation hook, lets already queued tasks finish, and joins the
/// queue's threads; delayed work still waiting on the timer is discarded.
pub struct ObservedScheduler<P: MetricProbe = ElapsedProbe> {
    hook: Arc<ObservationHook<P>>,
    queue: Arc<dyn ExecutionQueue>,
    timer: Arc<Timer>,
    leeway: Duration,
}

impl<P: MetricProbe> ObservedScheduler<P> {
    /// Serial context for a weighted priority: one task at a time, FIFO.
    ///
    /// # Panics
    ///
    /// Panics if `priority` is [`Priority::Ui`], which has no weight class;
    /// UI work goes through [`SchedulerRegistry::scheduler`].
    pub fn serial(
        registry: &Arc<SchedulerRegistry>,
        priority: Priority,
        sink: Arc<dyn MetricSink<P::Output>>,
    ) -> Result<Self> {
        let weight = weighted(priority);
        let config = registry.config();
        let label = format!("{}.observed.{}.serial", config.thread_name_prefix, weight);
        let queue = SerialQueue::new(config, label, weight.nice())?;

        tracing::debug!(%priority, %weight, "serial scheduler created");
        Ok(Self::with_queue(registry, priority, Arc::new(queue), sink))
    }

    /// Concurrent context for a weighted priority: tasks may run in parallel.
    ///
    /// # Panics
    ///
    /// Panics if `priority` is [`Priority::Ui`].
    pub fn concurrent(
        registry: &Arc<SchedulerRegistry>,
        priority: Priority,
        sink: Arc<dyn MetricSink<P::Output>>,
    ) -> Result<Self> {
        let weight = weighted(priority);
        let config = registry.config();
        let label = format!("{}.observed.{}", config.thread_name_prefix, weight);
        let threads = if config.scale_by_weight {
            weight.concurrency(config.worker_threads())
        } else {
            config.worker_threads()
        };
        let queue = ConcurrentQueue::new(config, label, threads, weight.nice())?;

        tracing::debug!(%priority, %weight, threads, "concurrent scheduler created");
        Ok(Self::with_queue(registry, priority, Arc::new(queue), sink))
    }

    /// Context on the registry's UI thread. UI work is timed and reported to
    /// the sink but never counted.
    pub(crate) fn ui(
        registry: &Arc<SchedulerRegistry>,
        inline: bool,
        sink: Arc<dyn MetricSink<P::Output>>,
    ) -> Self {
        let queue = UiQueue::new(registry.ui_queue(), inline);
        let scheduler = Self::with_queue(registry, Priority::Ui, Arc::new(queue), sink);
        scheduler.hook.detach();
        scheduler
    }

    fn with_queue(
        registry: &Arc<SchedulerRegistry>,
        priority: Priority,
        queue: Arc<dyn ExecutionQueue>,
        sink: Arc<dyn MetricSink<P::Output>>,
    ) -> Self {
        Self {
            hook: Arc::new(ObservationHook::new(priority, registry.clone(), sink)),
            queue,
            timer: registry.timer(),
            leeway: registry.config().leeway,
        }
    }

    /// Replace the timer tolerance applied to delayed and periodic work.
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    pub fn priority(&self) -> Priority {
        self.hook.priority()
    }

    pub fn kind(&self) -> QueueKind {
        self.queue.kind()
    }

    pub fn label(&self) -> &str {
        self.queue.label()
    }

    pub fn leeway(&self) -> Duration {
        self.leeway
    }

    /// Stop counting tasks submitted through this scheduler, including ones
    /// already queued. They still run and are still timed.
    pub fn detach(&self) {
        self.hook.detach();
    }

    /// Whether tasks are still counted. Always `false` for the UI scheduler.
    pub fn is_attached(&self) -> bool {
        self.hook.is_attached()
    }

    /// Tasks waiting in the execution queue.
    pub fn pending_tasks(&self) -> usize {
        self.queue.pending()
    }

    /// Tasks that panicked on the execution queue's threads. The UI
    /// scheduler reports the shared UI thread.
    pub fn panic_count(&self) -> usize {
        self.queue.panic_count()
    }

    /// Run `action(state)` as soon as the context can take it.
    pub fn schedule<S, R, F>(&self, state: S, action: F) -> TaskHandle<R>
    where
        S: Send + 'static,
        R: Send + 'static,
        F: FnOnce(S) -> R + Send + 'static,
    {
        let (handle, task) = self.prepare(state, action);
        self.queue.submit(task);
        handle
    }

    /// Run `action(state)` once `due_time` has passed. A zero due time is
    /// the same as [`schedule`](ObservedScheduler::schedule).
    pub fn schedule_relative<S, R, F>(&self, state: S, due_time: Duration, action: F) -> TaskHandle<R>
    where
        S: Send + 'static,
        R: Send + 'static,
        F: FnOnce(S) -> R + Send + 'static,
    {
        if due_time.is_zero() {
            return self.schedule(state, action);
        }

        let (handle, task) = self.prepare(state, action);
        let cancellation = handle.cancellation();
        let queue = Arc::downgrade(&self.queue);

        self.timer.schedule(due_time, self.leeway, move || {
            if cancellation.is_cancelled() {
                return;
            }
            if let Some(queue) = queue.upgrade() {
                queue.submit(task);
            }
        });
        handle
    }

    /// Run `action` first after `start_after`, then again `period` after each
    /// run completes, threading the returned state into the next run.
    pub fn schedule_periodic<S, F>(
        &self,
        state: S,
        start_after: Duration,
        period: Duration,
        action: F,
    ) -> CancellationHandle
    where
        S: Send + 'static,
        F: FnMut(S) -> S + Send + 'static,
    {
        let cancellation = CancellationHandle::new();
        let job = PeriodicJob::new(
            state,
            Box::new(action),
            self.hook.clone(),
            period,
            self.leeway,
            cancellation.clone(),
            Arc::downgrade(&self.queue),
            Arc::downgrade(&self.timer),
        );
        job.start(start_after);
        cancellation
    }

    fn prepare<S, R, F>(&self, state: S, action: F) -> (TaskHandle<R>, Task)
    where
        S: Send + 'static,
        R: Send + 'static,
        F: FnOnce(S) -> R + Send + 'static,
    {
        let cancellation = CancellationHandle::new();
        let (tx, rx) = crossbeam_channel::bounded(1);
        let hook = self.hook.clone();
        let token = cancellation.clone();

        let task = Task::new(move || {
            if token.is_cancelled() {
                return;
            }
            match panic::catch_unwind(AssertUnwindSafe(|| hook.observe(|| action(state)))) {
                Ok(value) => {
                    let _ = tx.send(Ok(value));
                }
                Err(payload) => {
                    let _ = tx.send(Err(panic_message(payload.as_ref())));
                    // The queue's panic handler applies the configured strategy.
                    panic::resume_unwind(payload);
                }
            }
        });

        (TaskHandle::new(cancellation, rx), task)
    }
}

fn weighted(priority: Priority) -> WeightClass {
    match priority.weight_class() {
        Some(weight) => weight,
        None => panic!("priority `{}` has no weight class; use the UI scheduler", priority),
    }
}

impl<P: MetricProbe> std::fmt::Debug for ObservedScheduler<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservedScheduler")
            .field("priority", &self.priority())
            .field("kind", &self.kind())
            .field("queue", &self.queue)
            .field("leeway", &self.leeway)
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl<P: MetricProbe> Drop for ObservedScheduler<P> {
    fn drop(&mut self) {
        self.hook.detach();
    }
}
