use super::panic_handler::PanicHandler;
use super::task::Task;
use super::{ExecutionQueue, QueueKind};
use crate::config::Config;
use crate::error::Result;
use crate::util::thread as qthread;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{JoinHandle, ThreadId};

/// One dedicated thread draining a FIFO channel; tasks never overlap.
pub struct SerialQueue {
    label: String,
    sender: Option<Sender<Task>>,
    thread: Option<JoinHandle<()>>,
    thread_id: ThreadId,
    panic_handler: Arc<PanicHandler>,
}

impl SerialQueue {
    pub fn new(config: &Config, label: String, nice: i32) -> Result<Self> {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let panic_handler = Arc::new(PanicHandler::new(config.panic_strategy));
        let adjust = config.adjust_thread_priority;

        let handler = panic_handler.clone();
        let thread_label = label.clone();
        let thread = qthread::spawn(config, label.clone(), move || {
            if adjust {
                qthread::lower_current_priority(nice);
            }
            drain(&thread_label, receiver, &handler);
        })?;
        let thread_id = thread.thread().id();

        tracing::debug!(queue = %label, "serial queue started");

        Ok(Self {
            label,
            sender: Some(sender),
            thread: Some(thread),
            thread_id,
            panic_handler,
        })
    }

    /// Whether the caller is running on this queue's thread.
    pub fn is_current(&self) -> bool {
        std::thread::current().id() == self.thread_id
    }

    pub(crate) fn run_inline(&self, task: Task) {
        self.panic_handler.run(task);
    }
}

fn drain(label: &str, receiver: Receiver<Task>, handler: &PanicHandler) {
    // Ends once the queue drops its sender and the backlog is empty.
    for task in receiver.iter() {
        handler.run(task);
    }
    tracing::debug!(queue = %label, "serial queue stopped");
}

impl ExecutionQueue for SerialQueue {
    fn submit(&self, task: Task) {
        if let Some(sender) = &self.sender {
            if let Err(err) = sender.send(task) {
                tracing::warn!(queue = %self.label, task = ?err.into_inner().id(), "serial queue closed, task dropped");
            }
        }
    }

    fn kind(&self) -> QueueKind {
        QueueKind::Serial
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn pending(&self) -> usize {
        self.sender.as_ref().map_or(0, |sender| sender.len())
    }

    fn panic_count(&self) -> usize {
        self.panic_handler.panic_count()
    }
}

impl std::fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialQueue")
            .field("label", &self.label)
            .field("thread_id", &self.thread_id)
            .finish()
    }
}

impl Drop for SerialQueue {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(thread) = self.thread.take() {
            qthread::join_unless_current(thread);
        }
    }
}
