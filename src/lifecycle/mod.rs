//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (coordinator.rs + registry.rs):
//!     add_resource / remove_resource
//!     → registry.rs (ordered, tagged entries)
//!     → reconcile exit hook: installed ⇔ registry non-empty
//!
//! Stop pass (coordinator.rs):
//!     Acquire re-entrant stop lock
//!     → stop watchdogs → signal event loops → signal worker pools
//!     → await event loops, then pools (bounded per resource)
//!     → release lock → drop exit hook unless running inside it
//!
//! Dispatch (dispatch.rs):
//!     shutdown() / shutdown_awaiting() → dedicated worker thread → stop pass
//!
//! Exit (exit_hook.rs):
//!     process exit → atexit → hook table → zero-timeout stop pass
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT/SIGQUIT → application decides
//! ```
//!
//! # Design Decisions
//! - Registration never takes the stop lock; it keeps working during a pass
//! - One pass at a time; a second caller waits for the first to finish
//! - Stuck resources cost at most their own timeout and are reported, never retried
//! - The coordinator is reusable: a finished pass leaves resources registered

pub mod coordinator;
pub mod dispatch;
pub mod exit_hook;
pub mod registry;
pub mod signals;

pub use coordinator::{CleanShutdown, InvocationContext};
pub use dispatch::{DispatchError, ShutdownHandle};
pub use exit_hook::{ExitHook, ExitHookRegistrar, HookId, HookTable, NoExitHooks, ProcessExitHooks};
