//! Broadcast-driven group of async tasks.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::resource::{EventLoopGroup, Interrupted};

/// A group of long-running tasks that stop together.
///
/// Every task holds a [`ShutdownSignal`]; the group is terminated once all
/// signals have been dropped.
pub struct TaskGroup {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
    /// Set before the broadcast so late subscribers see it.
    triggered: Arc<AtomicBool>,
    live: Arc<LiveCount>,
}

#[derive(Default)]
struct LiveCount {
    count: Mutex<usize>,
    drained: Condvar,
}

/// Per-task view of the group's shutdown signal.
pub struct ShutdownSignal {
    rx: broadcast::Receiver<()>,
    triggered: Arc<AtomicBool>,
    _guard: LiveGuard,
}

struct LiveGuard {
    live: Arc<LiveCount>,
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        let mut count = self.live.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.live.drained.notify_all();
        }
    }
}

impl TaskGroup {
    /// Create an empty task group.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
            live: Arc::new(LiveCount::default()),
        }
    }

    /// Subscribe to the shutdown signal.
    ///
    /// The group counts the subscriber as live until the signal is dropped.
    pub fn subscribe(&self) -> ShutdownSignal {
        *self.live.count.lock() += 1;
        ShutdownSignal {
            rx: self.tx.subscribe(),
            triggered: self.triggered.clone(),
            _guard: LiveGuard {
                live: self.live.clone(),
            },
        }
    }

    /// Spawn a task on `handle` that owns its own shutdown signal.
    pub fn spawn<F, Fut>(&self, handle: &Handle, task: F) -> JoinHandle<()>
    where
        F: FnOnce(ShutdownSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        handle.spawn(task(self.subscribe()))
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Number of tasks still holding a signal.
    pub fn active(&self) -> usize {
        *self.live.count.lock()
    }
}

impl Default for TaskGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Resolve once the group has been told to shut down.
    pub async fn recv(&mut self) {
        if self.triggered.load(Ordering::SeqCst) {
            return;
        }
        // Lagged and Closed both mean the trigger already fired.
        let _ = self.rx.recv().await;
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

impl EventLoopGroup for TaskGroup {
    fn shutdown_gracefully(&self) {
        tracing::debug!(active = self.active(), "Task group shutdown requested");
        self.trigger();
    }

    fn await_termination(&self, timeout: Duration) -> Result<bool, Interrupted> {
        let mut count = self.live.count.lock();
        self.live
            .drained
            .wait_while_for(&mut count, |c| *c > 0, timeout);
        Ok(*count == 0)
    }
}
