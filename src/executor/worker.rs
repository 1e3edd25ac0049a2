// worker thread of a concurrent queue
use super::panic_handler::PanicHandler;
use super::task::Task;
use crate::util::Backoff;
use crossbeam_deque::{Injector, Steal, Stealer, Worker as WorkerQueue};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub type WorkerId = usize;

/// Everything a worker shares with its pool.
pub(crate) struct WorkerContext {
    pub stealers: Vec<Stealer<Task>>,
    pub injector: Arc<Injector<Task>>,
    pub shutdown: Arc<AtomicBool>,
    pub pending: Arc<AtomicUsize>,
    pub panic_handler: Arc<PanicHandler>,
}

pub(crate) struct Worker {
    pub id: WorkerId,
    pub local_queue: WorkerQueue<Task>,
}

impl Worker {
    pub fn new(id: WorkerId) -> Self {
        Self {
            id,
            local_queue: WorkerQueue::new_fifo(),
        }
    }

    // main loop
    pub fn run(&self, ctx: WorkerContext) {
        let mut backoff = Backoff::new();

        loop {
            // local -> global -> steal
            if let Some(task) = self.find_task(&ctx.stealers, &ctx.injector) {
                backoff.reset();
                ctx.pending.fetch_sub(1, Ordering::AcqRel);
                ctx.panic_handler.run(task);
            } else if ctx.shutdown.load(Ordering::Acquire) {
                // backlog drained
                break;
            } else {
                backoff.snooze();
            }
        }
    }

    fn find_task(&self, stealers: &[Stealer<Task>], injector: &Injector<Task>) -> Option<Task> {
        if let Some(task) = self.local_queue.pop() {
            return Some(task);
        }

        loop {
            match injector.steal_batch_and_pop(&self.local_queue) {
                Steal::Success(task) => return Some(task),
                Steal::Empty => break,
                Steal::Retry => continue,
            }
        }

        self.try_steal_from_workers(stealers)
    }

    fn try_steal_from_workers(&self, stealers: &[Stealer<Task>]) -> Option<Task> {
        use rand::seq::SliceRandom;
        use rand::thread_rng;

        if stealers.len() < 2 {
            return None;
        }

        let mut indices: Vec<usize> = (0..stealers.len()).collect();
        indices.shuffle(&mut thread_rng());

        for &idx in &indices {
            if idx == self.id {
                continue;
            }

            loop {
                match stealers[idx].steal_batch_and_pop(&self.local_queue) {
                    Steal::Success(task) => return Some(task),
                    Steal::Empty => break,
                    Steal::Retry => continue,
                }
            }
        }

        None
    }
}
