//! Worker pool backed by an owned multi-thread Tokio runtime.

use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tokio::runtime::{Builder, Handle, Runtime};

use crate::resource::{Interrupted, WorkerPool};

/// A named Tokio runtime that can be shut down without blocking the caller.
///
/// `shutdown` moves the runtime onto a helper thread and drops it there;
/// dropping waits for outstanding blocking tasks, async tasks are cancelled
/// at their next yield point.
pub struct RuntimePool {
    name: String,
    handle: Handle,
    runtime: Mutex<Option<Runtime>>,
    terminated: Arc<Terminated>,
}

#[derive(Default)]
struct Terminated {
    done: Mutex<bool>,
    cond: Condvar,
}

impl Terminated {
    fn mark(&self) {
        *self.done.lock() = true;
        self.cond.notify_all();
    }
}

impl RuntimePool {
    /// Build a pool with `worker_threads` workers.
    pub fn new(name: impl Into<String>, worker_threads: usize) -> io::Result<Self> {
        let name = name.into();
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name(format!("{}-worker", name))
            .enable_all()
            .build()?;

        tracing::debug!(pool = %name, worker_threads, "Worker pool started");

        Ok(Self {
            name,
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            terminated: Arc::new(Terminated::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Handle for spawning work onto the pool.
    ///
    /// Spawning after shutdown yields tasks that never run.
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn is_terminated(&self) -> bool {
        *self.terminated.done.lock()
    }
}

impl WorkerPool for RuntimePool {
    fn shutdown(&self) {
        let Some(runtime) = self.runtime.lock().take() else {
            return;
        };

        let terminated = self.terminated.clone();
        let name = self.name.clone();
        let spawned = thread::Builder::new()
            .name(format!("{}-teardown", self.name))
            .spawn(move || {
                drop(runtime);
                terminated.mark();
                tracing::debug!(pool = %name, "Worker pool terminated");
            });

        if let Err(e) = spawned {
            // The closure, and the runtime with it, was dropped on this thread.
            tracing::warn!(pool = %self.name, error = %e, "Teardown thread unavailable, stopped inline");
            self.terminated.mark();
        }
    }

    fn await_termination(&self, timeout: Duration) -> Result<bool, Interrupted> {
        let mut done = self.terminated.done.lock();
        self.terminated
            .cond
            .wait_while_for(&mut done, |d| !*d, timeout);
        Ok(*done)
    }
}
