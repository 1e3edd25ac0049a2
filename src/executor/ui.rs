use super::serial::SerialQueue;
use super::task::Task;
use super::{ExecutionQueue, QueueKind};
use std::sync::Arc;

/// View onto the registry's single UI-confined thread.
///
/// With `inline` set, a task submitted from the UI thread itself runs
/// immediately instead of being queued behind whatever is pending.
#[derive(Debug, Clone)]
pub struct UiQueue {
    queue: Arc<SerialQueue>,
    inline: bool,
}

impl UiQueue {
    pub(crate) fn new(queue: Arc<SerialQueue>, inline: bool) -> Self {
        Self { queue, inline }
    }
}

impl ExecutionQueue for UiQueue {
    fn submit(&self, task: Task) {
        if self.inline && self.queue.is_current() {
            self.queue.run_inline(task);
        } else {
            self.queue.submit(task);
        }
    }

    fn kind(&self) -> QueueKind {
        QueueKind::Ui
    }

    fn label(&self) -> &str {
        self.queue.label()
    }

    fn pending(&self) -> usize {
        self.queue.pending()
    }

    fn panic_count(&self) -> usize {
        self.queue.panic_count()
    }
}
