use super::priority::Priority;
use crate::registry::SchedulerRegistry;
use crate::telemetry::{MetricProbe, MetricSink, Outcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Observation state owned by one scheduler and shared with the tasks it
/// submitted.
///
/// Every firing counts against the registry counter of `priority` and is
/// timed by a fresh probe. Once the owning scheduler is disposed the hook
/// is detached: tasks still run and are still timed, but no longer counted.
pub(crate) struct ObservationHook<P: MetricProbe> {
    priority: Priority,
    registry: Arc<SchedulerRegistry>,
    sink: Arc<dyn MetricSink<P::Output>>,
    attached: AtomicBool,
}

impl<P: MetricProbe> ObservationHook<P> {
    pub(crate) fn new(
        priority: Priority,
        registry: Arc<SchedulerRegistry>,
        sink: Arc<dyn MetricSink<P::Output>>,
    ) -> Self {
        Self {
            priority,
            registry,
            sink,
            attached: AtomicBool::new(true),
        }
    }

    pub(crate) fn priority(&self) -> Priority {
        self.priority
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    pub(crate) fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    /// Run `action` under observation and hand back its result untouched.
    ///
    /// A panic in `action` keeps unwinding; the measurement is still
    /// delivered to the sink on the way out.
    pub(crate) fn observe<R>(&self, action: impl FnOnce() -> R) -> R {
        if self.is_attached() {
            self.registry.advance(self.priority);
        }

        let _guard = ProbeGuard {
            probe: P::start(),
            hook: self,
        };
        action()
    }
}

struct ProbeGuard<'a, P: MetricProbe> {
    probe: P,
    hook: &'a ObservationHook<P>,
}

impl<P: MetricProbe> Drop for ProbeGuard<'_, P> {
    fn drop(&mut self) {
        let outcome = if thread::panicking() {
            Outcome::Panicked
        } else {
            Outcome::Completed
        };
        let measurement = self.probe.finish();
        self.hook.sink.record(self.hook.priority, outcome, &measurement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::telemetry::ElapsedProbe;
    use parking_lot::Mutex;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::time::Duration;

    #[derive(Default)]
    struct Captured(Mutex<Vec<(Priority, Outcome)>>);

    impl MetricSink<Duration> for Captured {
        fn record(&self, priority: Priority, outcome: Outcome, _: &Duration) {
            self.0.lock().push((priority, outcome));
        }
    }

    fn hook(sink: Arc<Captured>) -> (Arc<SchedulerRegistry>, ObservationHook<ElapsedProbe>) {
        let registry = SchedulerRegistry::new(Config::default()).unwrap();
        let hook = ObservationHook::new(Priority::High, registry.clone(), sink);
        (registry, hook)
    }

    #[test]
    fn test_observe_counts_and_measures() {
        let sink = Arc::new(Captured::default());
        let (registry, hook) = hook(sink.clone());

        assert_eq!(hook.observe(|| 40 + 2), 42);
        assert_eq!(registry.counter(Priority::High).value(), 1);
        assert_eq!(*sink.0.lock(), vec![(Priority::High, Outcome::Completed)]);
    }

    #[test]
    fn test_observe_passes_errors_through() {
        let sink = Arc::new(Captured::default());
        let (registry, hook) = hook(sink);

        let result: Result<(), &str> = hook.observe(|| Err("nope"));
        assert_eq!(result, Err("nope"));
        assert_eq!(registry.counter(Priority::High).value(), 1);
    }

    #[test]
    fn test_observe_measures_panics() {
        let sink = Arc::new(Captured::default());
        let (registry, hook) = hook(sink.clone());

        let result = catch_unwind(AssertUnwindSafe(|| hook.observe(|| panic!("boom"))));
        assert!(result.is_err());
        assert_eq!(registry.counter(Priority::High).value(), 1);
        assert_eq!(*sink.0.lock(), vec![(Priority::High, Outcome::Panicked)]);
    }

    #[test]
    fn test_detached_hook_skips_count_but_runs() {
        let sink = Arc::new(Captured::default());
        let (registry, hook) = hook(sink.clone());

        hook.detach();
        assert_eq!(hook.observe(|| "ran"), "ran");
        assert_eq!(registry.counter(Priority::High).value(), 0);
        assert_eq!(sink.0.lock().len(), 1);
    }
}
