//! Graceful shutdown coordination for long-running resources.
//!
//! Applications register their event loop groups, worker pools and liveness
//! watchdogs with a [`CleanShutdown`] coordinator. When the process is asked
//! to stop, explicitly or by its own exit sequence, every registered resource
//! is stopped once per pass, in a fixed order, with a bounded wait per
//! resource and a single success flag for the whole pass.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod resource;

pub use config::CoordinatorConfig;
pub use lifecycle::{CleanShutdown, DispatchError, InvocationContext, ShutdownHandle};
pub use resource::{EventLoopGroup, Interrupted, ResourceHandle, ResourceKind, Watchdog, WorkerPool};
