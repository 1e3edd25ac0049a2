//! Timer thread for delayed and periodic scheduling.
//!
//! Entries are kept in a min-heap keyed by their latest acceptable firing
//! time (`due + leeway`). When the thread wakes it fires every entry that is
//! already due, so entries with overlapping tolerance windows share a single
//! wake-up. An entry never fires before its due time.

use crate::config::Config;
use crate::error::Result;
use crate::util::thread as qthread;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

type Fire = Box<dyn FnOnce() + Send + 'static>;

struct Entry {
    due: Instant,
    latest: Instant,
    seq: u64,
    fire: Fire,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // reversed: BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .latest
            .cmp(&self.latest)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Default)]
struct TimerState {
    heap: BinaryHeap<Entry>,
    next_seq: u64,
    shutdown: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<TimerState>,
    wakeup: Condvar,
}

pub struct Timer {
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl Timer {
    pub fn new(config: &Config) -> Result<Self> {
        let shared = Arc::new(Shared::default());
        let name = format!("{}.timer", config.thread_name_prefix);

        let thread_shared = shared.clone();
        let thread = qthread::spawn(config, name, move || run(&thread_shared))?;

        Ok(Self {
            shared,
            thread: Some(thread),
        })
    }

    /// Run `fire` on the timer thread once `delay` has elapsed, at most
    /// `leeway` later than that.
    pub fn schedule<F>(&self, delay: Duration, leeway: Duration, fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let due = Instant::now() + delay;
        let mut state = self.shared.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.heap.push(Entry {
            due,
            latest: due + leeway,
            seq,
            fire: Box::new(fire),
        });
        drop(state);
        self.shared.wakeup.notify_one();
    }

    pub fn pending(&self) -> usize {
        self.shared.state.lock().heap.len()
    }
}

fn run(shared: &Shared) {
    let mut state = shared.state.lock();

    loop {
        if state.shutdown {
            break;
        }

        let ready = take_ready(&mut state, Instant::now());
        if !ready.is_empty() {
            MutexGuard::unlocked(&mut state, || {
                for fire in ready {
                    fire();
                }
            });
            continue;
        }

        match state.heap.peek().map(|entry| entry.latest) {
            Some(deadline) => {
                shared.wakeup.wait_until(&mut state, deadline);
            }
            None => shared.wakeup.wait(&mut state),
        }
    }

    tracing::debug!(dropped = state.heap.len(), "timer stopped");
}

fn take_ready(state: &mut TimerState, now: Instant) -> Vec<Fire> {
    match state.heap.peek() {
        Some(first) if first.latest <= now => {}
        _ => return Vec::new(),
    }

    let (ready, waiting): (Vec<Entry>, Vec<Entry>) = std::mem::take(&mut state.heap)
        .into_vec()
        .into_iter()
        .partition(|entry| entry.due <= now);
    state.heap = BinaryHeap::from(waiting);

    let mut ready = ready;
    ready.sort_by(|a, b| a.due.cmp(&b.due).then_with(|| a.seq.cmp(&b.seq)));
    ready.into_iter().map(|entry| entry.fire).collect()
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer").field("pending", &self.pending()).finish()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.wakeup.notify_all();
        if let Some(thread) = self.thread.take() {
            qthread::join_unless_current(thread);
        }
    }
}
