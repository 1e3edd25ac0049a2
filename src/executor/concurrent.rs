use super::panic_handler::PanicHandler;
use super::task::Task;
use super::worker::{Worker, WorkerContext, WorkerId};
use super::{ExecutionQueue, QueueKind};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::util::thread as qthread;
use crossbeam_deque::Injector;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Pool of worker threads sharing one injector; tasks may run in parallel.
pub struct ConcurrentQueue {
    label: String,
    workers: Vec<WorkerHandle>,
    injector: Arc<Injector<Task>>,
    shutdown: Arc<AtomicBool>,
    pending: Arc<AtomicUsize>,
    next_wake: AtomicUsize,
    panic_handler: Arc<PanicHandler>,
}

struct WorkerHandle {
    id: WorkerId,
    thread: Option<JoinHandle<()>>,
    unparker: thread::Thread,
}

impl ConcurrentQueue {
    pub fn new(config: &Config, label: String, num_threads: usize, nice: i32) -> Result<Self> {
        if num_threads == 0 {
            return Err(Error::config("need at least 1 worker thread"));
        }

        let injector = Arc::new(Injector::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let pending = Arc::new(AtomicUsize::new(0));
        let panic_handler = Arc::new(PanicHandler::new(config.panic_strategy));

        let workers: Vec<Worker> = (0..num_threads).map(Worker::new).collect();
        let stealers: Vec<_> = workers.iter().map(|w| w.local_queue.stealer()).collect();

        let mut handles = Vec::with_capacity(num_threads);
        for worker in workers {
            let id = worker.id;
            let ctx = WorkerContext {
                stealers: stealers.clone(),
                injector: injector.clone(),
                shutdown: shutdown.clone(),
                pending: pending.clone(),
                panic_handler: panic_handler.clone(),
            };
            let adjust = config.adjust_thread_priority;

            let spawned = qthread::spawn(config, format!("{}-{}", label, id), move || {
                if adjust {
                    qthread::lower_current_priority(nice);
                }
                worker.run(ctx);
            });

            let thread = match spawned {
                Ok(thread) => thread,
                Err(err) => {
                    // let the workers already running drain and exit
                    shutdown.store(true, Ordering::Release);
                    for handle in &mut handles {
                        stop_worker(handle);
                    }
                    return Err(err);
                }
            };

            handles.push(WorkerHandle {
                id,
                unparker: thread.thread().clone(),
                thread: Some(thread),
            });
        }

        tracing::debug!(queue = %label, workers = num_threads, "concurrent queue started");

        Ok(Self {
            label,
            workers: handles,
            injector,
            shutdown,
            pending,
            next_wake: AtomicUsize::new(0),
            panic_handler,
        })
    }

    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);

        // wake everyone up to check shutdown flag
        for worker in &self.workers {
            worker.unparker.unpark();
        }

        for worker in &mut self.workers {
            stop_worker(worker);
        }

        tracing::debug!(queue = %self.label, "concurrent queue stopped");
    }
}

fn stop_worker(worker: &mut WorkerHandle) {
    worker.unparker.unpark();
    if let Some(thread) = worker.thread.take() {
        qthread::join_unless_current(thread);
    }
}

impl ExecutionQueue for ConcurrentQueue {
    fn submit(&self, task: Task) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        self.injector.push(task);

        let idx = self.next_wake.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        self.workers[idx].unparker.unpark();
    }

    fn kind(&self) -> QueueKind {
        QueueKind::Concurrent
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    fn panic_count(&self) -> usize {
        self.panic_handler.panic_count()
    }
}

impl std::fmt::Debug for ConcurrentQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcurrentQueue")
            .field("label", &self.label)
            .field("workers", &self.workers.iter().map(|w| w.id).collect::<Vec<_>>())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Drop for ConcurrentQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}
