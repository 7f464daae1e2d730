//! Resource capabilities understood by the shutdown coordinator.
//!
//! # Data Flow
//! ```text
//! Owner builds a resource (event loop group, worker pool, watchdog)
//!     → wraps it in a ResourceHandle (tagged by ResourceKind)
//!     → registers it with the coordinator
//!
//! Stop pass:
//!     Watchdog::stop()                     (immediate, no await)
//!     EventLoopGroup::shutdown_gracefully() (non-blocking signal)
//!     WorkerPool::shutdown()               (non-blocking signal)
//!     await_termination(timeout)           (event loops, then pools)
//! ```
//!
//! # Design Decisions
//! - One tagged handle type instead of three parallel collections
//! - The tag only picks the stop phase; watchdogs have no await capability
//! - The coordinator never owns a resource's lifecycle, it only asks it to stop
//! - Every stop/await call must be safe to repeat: the coordinator does not
//!   deduplicate registrations and a second pass re-invokes everything

pub mod runtime_pool;
pub mod task_group;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use runtime_pool::RuntimePool;
pub use task_group::{ShutdownSignal, TaskGroup};

/// The wait for a resource's termination was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("wait for termination was interrupted")]
pub struct Interrupted;

/// A group of event-loop workers processing asynchronous I/O.
pub trait EventLoopGroup: Send + Sync {
    /// Ask the group to drain and stop. Must not block.
    fn shutdown_gracefully(&self);

    /// Block up to `timeout` for the group to terminate.
    ///
    /// Returns `Ok(true)` once terminated, `Ok(false)` if the timeout elapsed.
    fn await_termination(&self, timeout: Duration) -> Result<bool, Interrupted>;
}

/// A general-purpose task execution pool.
pub trait WorkerPool: Send + Sync {
    /// Ask the pool to stop accepting work and wind down. Must not block.
    fn shutdown(&self);

    /// Block up to `timeout` for the pool to terminate.
    fn await_termination(&self, timeout: Duration) -> Result<bool, Interrupted>;
}

/// A periodic liveness checker.
pub trait Watchdog: Send + Sync {
    /// Stop checking immediately. Must not block.
    fn stop(&self);
}

/// Resource category; selects the phase of the stop pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Watchdog,
    EventLoop,
    WorkerPool,
}

impl ResourceKind {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Watchdog => "watchdog",
            ResourceKind::EventLoop => "event_loop",
            ResourceKind::WorkerPool => "worker_pool",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered resource together with its category.
#[derive(Clone)]
pub enum ResourceHandle {
    EventLoop(Arc<dyn EventLoopGroup>),
    WorkerPool(Arc<dyn WorkerPool>),
    Watchdog(Arc<dyn Watchdog>),
}

impl ResourceHandle {
    pub fn event_loop<T: EventLoopGroup + 'static>(group: Arc<T>) -> Self {
        ResourceHandle::EventLoop(group)
    }

    pub fn worker_pool<T: WorkerPool + 'static>(pool: Arc<T>) -> Self {
        ResourceHandle::WorkerPool(pool)
    }

    pub fn watchdog<T: Watchdog + 'static>(watchdog: Arc<T>) -> Self {
        ResourceHandle::Watchdog(watchdog)
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceHandle::EventLoop(_) => ResourceKind::EventLoop,
            ResourceHandle::WorkerPool(_) => ResourceKind::WorkerPool,
            ResourceHandle::Watchdog(_) => ResourceKind::Watchdog,
        }
    }

    /// True if both handles point at the same resource instance.
    ///
    /// Compares data pointers only; vtable pointers of the same type may
    /// differ across codegen units.
    pub fn same_resource(&self, other: &ResourceHandle) -> bool {
        self.kind() == other.kind() && self.data_ptr() == other.data_ptr()
    }

    fn data_ptr(&self) -> *const () {
        match self {
            ResourceHandle::EventLoop(r) => Arc::as_ptr(r) as *const (),
            ResourceHandle::WorkerPool(r) => Arc::as_ptr(r) as *const (),
            ResourceHandle::Watchdog(r) => Arc::as_ptr(r) as *const (),
        }
    }

    /// Send the phase-appropriate stop request.
    pub fn request_stop(&self) {
        match self {
            ResourceHandle::EventLoop(r) => r.shutdown_gracefully(),
            ResourceHandle::WorkerPool(r) => r.shutdown(),
            ResourceHandle::Watchdog(r) => r.stop(),
        }
    }

    /// Await termination, or `None` for resources that cannot be awaited.
    pub fn await_termination(&self, timeout: Duration) -> Option<Result<bool, Interrupted>> {
        match self {
            ResourceHandle::EventLoop(r) => Some(r.await_termination(timeout)),
            ResourceHandle::WorkerPool(r) => Some(r.await_termination(timeout)),
            ResourceHandle::Watchdog(_) => None,
        }
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("kind", &self.kind())
            .field("ptr", &self.data_ptr())
            .finish()
    }
}
