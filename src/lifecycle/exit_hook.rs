//! Process exit hooks.
//!
//! # Responsibilities
//! - Abstract the host's exit-hook table behind [`ExitHookRegistrar`]
//! - Provide a process-wide table driven by `atexit`
//! - Provide a standalone table that tests and embedders fire by hand
//!
//! # Design Decisions
//! - Hooks are one-shot; running a table drains it first
//! - Removing an unknown or already-run hook returns false, never fails
//! - A panicking hook does not prevent the remaining hooks from running

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

/// Callback run once when the process exits.
pub type ExitHook = Box<dyn FnOnce() + Send + 'static>;

/// Identity of an installed hook, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook-{}", self.0)
    }
}

/// Capability to install and remove exit-time callbacks.
pub trait ExitHookRegistrar: Send + Sync {
    /// Install `hook`; it runs at most once.
    fn install(&self, hook: ExitHook) -> HookId;

    /// Remove a previously installed hook. Returns false if it is not installed.
    fn remove(&self, id: HookId) -> bool;

    /// Whether installed hooks ever run. Coordinators skip installing when false.
    fn runs_hooks(&self) -> bool {
        true
    }
}

/// An in-process exit-hook table.
#[derive(Default)]
pub struct HookTable {
    next_id: AtomicU64,
    hooks: Mutex<Vec<(HookId, ExitHook)>>,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hooks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.lock().is_empty()
    }

    pub fn contains(&self, id: HookId) -> bool {
        self.hooks.lock().iter().any(|(h, _)| *h == id)
    }

    /// Run every installed hook in installation order. Returns how many ran.
    ///
    /// The table is emptied before the first hook runs, so hooks may install
    /// or remove hooks without deadlocking.
    pub fn run_all(&self) -> usize {
        let hooks = std::mem::take(&mut *self.hooks.lock());
        let count = hooks.len();
        for (id, hook) in hooks {
            if catch_unwind(AssertUnwindSafe(hook)).is_err() {
                tracing::error!(hook = %id, "Exit hook panicked");
            }
        }
        count
    }
}

impl ExitHookRegistrar for HookTable {
    fn install(&self, hook: ExitHook) -> HookId {
        let id = HookId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.hooks.lock().push((id, hook));
        id
    }

    fn remove(&self, id: HookId) -> bool {
        let mut hooks = self.hooks.lock();
        match hooks.iter().position(|(h, _)| *h == id) {
            Some(index) => {
                drop(hooks.remove(index));
                true
            }
            None => false,
        }
    }
}

static PROCESS_HOOKS: Lazy<HookTable> = Lazy::new(HookTable::new);
static ATEXIT_REGISTERED: AtomicBool = AtomicBool::new(false);

/// The process-wide hook table, run by `atexit` on normal process exit.
///
/// `std::process::exit` (including from a signal handler path) and returning
/// from `main` both run it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExitHooks;

impl ProcessExitHooks {
    /// Number of hooks currently installed process-wide.
    pub fn installed() -> usize {
        PROCESS_HOOKS.len()
    }

    fn ensure_atexit() {
        if ATEXIT_REGISTERED.swap(true, Ordering::SeqCst) {
            return;
        }
        // SAFETY: `run_process_hooks` is a plain extern "C" fn with no
        // arguments that never unwinds across the FFI boundary.
        let rc = unsafe { libc::atexit(run_process_hooks) };
        if rc != 0 {
            ATEXIT_REGISTERED.store(false, Ordering::SeqCst);
            tracing::warn!(rc, "atexit registration failed; exit hooks will not run");
        }
    }
}

extern "C" fn run_process_hooks() {
    // catch_unwind is per hook inside run_all; this guards the table itself.
    let _ = catch_unwind(AssertUnwindSafe(|| PROCESS_HOOKS.run_all()));
}

impl ExitHookRegistrar for ProcessExitHooks {
    fn install(&self, hook: ExitHook) -> HookId {
        Self::ensure_atexit();
        PROCESS_HOOKS.install(hook)
    }

    fn remove(&self, id: HookId) -> bool {
        PROCESS_HOOKS.remove(id)
    }
}

/// A registrar that accepts hooks and never runs them.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExitHooks;

impl ExitHookRegistrar for NoExitHooks {
    fn install(&self, _hook: ExitHook) -> HookId {
        HookId(0)
    }

    fn remove(&self, _id: HookId) -> bool {
        false
    }

    fn runs_hooks(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_remove_is_idempotent() {
        let table = HookTable::new();
        let id = table.install(Box::new(|| {}));
        assert!(table.contains(id));
        assert!(table.remove(id));
        assert!(!table.remove(id));
        assert_eq!(table.run_all(), 0);
    }

    #[test]
    fn test_run_all_drains_and_runs_once() {
        let table = HookTable::new();
        let runs = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let r = runs.clone();
            table.install(Box::new(move || {
                r.fetch_add(1, Ordering::SeqCst);
            }));
        }

        assert_eq!(table.run_all(), 3);
        assert!(table.is_empty());
        assert_eq!(table.run_all(), 0);
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_panicking_hook_does_not_stop_others() {
        let table = HookTable::new();
        let ran = Arc::new(AtomicBool::new(false));
        let r = ran.clone();
        table.install(Box::new(|| panic!("boom")));
        table.install(Box::new(move || r.store(true, Ordering::SeqCst)));

        assert_eq!(table.run_all(), 2);
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_hook_may_touch_its_own_table() {
        let table = Arc::new(HookTable::new());
        let t = table.clone();
        let id = table.install(Box::new(move || {
            t.install(Box::new(|| {}));
        }));

        assert_eq!(table.run_all(), 1);
        assert!(!table.remove(id));
        assert_eq!(table.len(), 1);
    }
}
