//! Helpers shared by every thread the crate spawns.

use crate::config::Config;
use crate::error::{Error, Result};
use std::thread::{self, JoinHandle};

pub(crate) fn builder(config: &Config, name: String) -> thread::Builder {
    let mut builder = thread::Builder::new().name(name);
    if let Some(stack_size) = config.stack_size {
        builder = builder.stack_size(stack_size);
    }
    builder
}

pub(crate) fn spawn<F>(config: &Config, name: String, f: F) -> Result<JoinHandle<()>>
where
    F: FnOnce() + Send + 'static,
{
    builder(config, name.clone())
        .spawn(f)
        .map_err(|e| Error::executor(format!("failed to spawn {}: {}", name, e)))
}

/// Join `handle` unless it is the calling thread, which would deadlock.
pub(crate) fn join_unless_current(handle: JoinHandle<()>) {
    if handle.thread().id() == thread::current().id() {
        return;
    }
    if handle.join().is_err() {
        tracing::warn!("thread exited with a panic");
    }
}

/// Lower the scheduling priority of the calling thread by `nice`.
#[cfg(target_os = "linux")]
pub(crate) fn lower_current_priority(nice: i32) {
    if nice <= 0 {
        return;
    }
    // With PRIO_PROCESS and a thread id, Linux adjusts just that thread.
    let result = unsafe {
        let tid = libc::syscall(libc::SYS_gettid) as libc::id_t;
        libc::setpriority(libc::PRIO_PROCESS, tid, nice)
    };
    if result != 0 {
        tracing::warn!(
            thread = thread::current().name().unwrap_or("unknown"),
            nice,
            "failed to lower thread priority"
        );
    }
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn lower_current_priority(_nice: i32) {}
