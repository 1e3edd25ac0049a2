use super::handle::CancellationHandle;
use super::hook::ObservationHook;
use crate::executor::{ExecutionQueue, Task, Timer};
use crate::telemetry::MetricProbe;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;

type PeriodicAction<S> = Box<dyn FnMut(S) -> S + Send + 'static>;

/// Repeating job: fire on the timer, run on the queue, re-arm after the run.
///
/// Holds its queue and timer weakly so an abandoned scheduler stops the
/// repetition instead of being kept alive by it.
pub(crate) struct PeriodicJob<S, P: MetricProbe> {
    state: Mutex<Option<S>>,
    action: Mutex<PeriodicAction<S>>,
    hook: Arc<ObservationHook<P>>,
    period: Duration,
    leeway: Duration,
    cancellation: CancellationHandle,
    queue: Weak<dyn ExecutionQueue>,
    timer: Weak<Timer>,
}

impl<S, P> PeriodicJob<S, P>
where
    S: Send + 'static,
    P: MetricProbe,
{
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        state: S,
        action: PeriodicAction<S>,
        hook: Arc<ObservationHook<P>>,
        period: Duration,
        leeway: Duration,
        cancellation: CancellationHandle,
        queue: Weak<dyn ExecutionQueue>,
        timer: Weak<Timer>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(Some(state)),
            action: Mutex::new(action),
            hook,
            period,
            leeway,
            cancellation,
            queue,
            timer,
        })
    }

    pub(crate) fn start(self: Arc<Self>, start_after: Duration) {
        if start_after.is_zero() {
            self.fire();
        } else {
            self.arm(start_after);
        }
    }

    // Re-arming always goes through the timer thread, so a zero period on an
    // inline UI queue cannot recurse on the UI thread's stack.
    fn arm(self: Arc<Self>, delay: Duration) {
        if self.cancellation.is_cancelled() {
            return;
        }

        let Some(timer) = self.timer.upgrade() else {
            return;
        };
        let leeway = self.leeway;
        timer.schedule(delay, leeway, move || self.fire());
    }

    fn fire(self: Arc<Self>) {
        if self.cancellation.is_cancelled() {
            return;
        }
        let Some(queue) = self.queue.upgrade() else {
            tracing::debug!(priority = %self.hook.priority(), "periodic job stopped, queue is gone");
            return;
        };
        queue.submit(Task::new(move || self.run()));
    }

    fn run(self: Arc<Self>) {
        if self.cancellation.is_cancelled() {
            return;
        }

        // A panicking action leaves the state empty, which ends the repetition.
        let Some(state) = self.state.lock().take() else {
            return;
        };
        let next = {
            let mut action = self.action.lock();
            self.hook.observe(|| (*action)(state))
        };
        *self.state.lock() = Some(next);

        let period = self.period;
        self.arm(period);
    }
}
