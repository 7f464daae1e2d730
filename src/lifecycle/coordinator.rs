//! Shutdown coordination for registered resources.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, ReentrantMutex};
use uuid::Uuid;

use crate::config::ShutdownConfig;
use crate::lifecycle::exit_hook::{ExitHookRegistrar, HookId, NoExitHooks, ProcessExitHooks};
use crate::lifecycle::registry::Registry;
use crate::observability::metrics;
use crate::resource::{
    EventLoopGroup, Interrupted, ResourceHandle, ResourceKind, Watchdog, WorkerPool,
};

/// Who is running a stop pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationContext {
    /// An application thread or the background dispatcher.
    Caller,
    /// The process exit hook installed by the coordinator.
    ExitHook,
}

impl InvocationContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvocationContext::Caller => "caller",
            InvocationContext::ExitHook => "exit_hook",
        }
    }
}

/// Coordinator that stops every registered resource exactly once per pass.
///
/// Cheap to clone; clones share the same registry and exit hook.
///
/// While at least one resource is registered, an exit hook is installed with
/// the registrar; when the process exits, the hook runs a zero-timeout stop
/// pass. An explicit stop pass removes the hook, and the next registration
/// change reinstalls it if resources remain.
///
/// The installed hook keeps the coordinator alive, so dropping every clone
/// does not cancel the exit-time pass. Remove all resources (or run a stop
/// pass) to release it.
///
/// With a registrar that never runs hooks ([`NoExitHooks`]) nothing is
/// installed and [`CleanShutdown::is_hook_installed`] stays false.
#[derive(Clone)]
pub struct CleanShutdown {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    registrar: Arc<dyn ExitHookRegistrar>,
    /// Installed hook, if any. Guards every install/remove.
    hook: Mutex<Option<HookId>>,
    /// Re-entrant so an exit hook that fires while this thread is already
    /// inside a stop pass (or a resource that calls back in) can't deadlock.
    stop_lock: ReentrantMutex<()>,
}

impl CleanShutdown {
    /// Coordinator bound to the process-wide exit-hook table.
    pub fn new() -> Self {
        Self::with_registrar(Arc::new(ProcessExitHooks))
    }

    /// Coordinator bound to the given exit-hook registrar.
    pub fn with_registrar(registrar: Arc<dyn ExitHookRegistrar>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Registry::new(),
                registrar,
                hook: Mutex::new(None),
                stop_lock: ReentrantMutex::new(()),
            }),
        }
    }

    pub fn from_config(config: &ShutdownConfig) -> Self {
        if config.exit_hook {
            Self::new()
        } else {
            Self::with_registrar(Arc::new(NoExitHooks))
        }
    }

    /// Register a resource. Registering the same resource twice is allowed;
    /// it will then be stopped twice per pass.
    pub fn add_resource(&self, resource: ResourceHandle) {
        let kind = resource.kind();
        let count = self.inner.registry.add(resource);
        tracing::debug!(%kind, count, "Resource registered");
        metrics::record_registered(kind, count);
        self.inner.reconcile_hook();
    }

    /// Deregister the first matching registration, if any.
    pub fn remove_resource(&self, resource: &ResourceHandle) {
        let kind = resource.kind();
        if let Some(count) = self.inner.registry.remove(resource) {
            tracing::debug!(%kind, count, "Resource deregistered");
            metrics::record_registered(kind, count);
        }
        self.inner.reconcile_hook();
    }

    /// Registered resources of one kind, in registration order.
    pub fn resources(&self, kind: ResourceKind) -> Vec<ResourceHandle> {
        self.inner.registry.snapshot(kind)
    }

    pub fn event_loops(&self) -> Vec<Arc<dyn EventLoopGroup>> {
        self.resources(ResourceKind::EventLoop)
            .into_iter()
            .filter_map(|r| match r {
                ResourceHandle::EventLoop(group) => Some(group),
                _ => None,
            })
            .collect()
    }

    pub fn worker_pools(&self) -> Vec<Arc<dyn WorkerPool>> {
        self.resources(ResourceKind::WorkerPool)
            .into_iter()
            .filter_map(|r| match r {
                ResourceHandle::WorkerPool(pool) => Some(pool),
                _ => None,
            })
            .collect()
    }

    pub fn watchdogs(&self) -> Vec<Arc<dyn Watchdog>> {
        self.resources(ResourceKind::Watchdog)
            .into_iter()
            .filter_map(|r| match r {
                ResourceHandle::Watchdog(watchdog) => Some(watchdog),
                _ => None,
            })
            .collect()
    }

    /// Total registrations across all kinds.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }

    pub fn is_hook_installed(&self) -> bool {
        self.inner.hook.lock().is_some()
    }

    /// True while some thread is inside a stop pass.
    pub fn is_shutting_down(&self) -> bool {
        self.inner.stop_lock.is_locked()
    }

    /// Run one stop pass on the calling thread.
    ///
    /// Watchdogs are stopped first, then every event loop group and worker
    /// pool is asked to shut down. With a non-zero `per_resource_timeout`,
    /// each event loop group and then each worker pool is awaited for up to
    /// that long; a timeout or interrupted wait makes the result `false` but
    /// the remaining resources are still awaited. With a zero timeout nothing
    /// is awaited and the result is `true`.
    ///
    /// Blocks for at most `per_resource_timeout` times the number of awaited
    /// resources, plus the time spent waiting for a concurrent pass to finish.
    pub fn perform_shutdown(
        &self,
        per_resource_timeout: Duration,
        context: InvocationContext,
    ) -> bool {
        let pass_id = Uuid::new_v4();
        let started = Instant::now();

        let success = {
            let _pass = self.inner.stop_lock.lock();
            self.inner.stop_pass(pass_id, per_resource_timeout)
        };

        match context {
            // The host is already running (and discarding) the hook.
            InvocationContext::ExitHook => self.inner.forget_hook(),
            InvocationContext::Caller => self.inner.detach_hook(),
        }

        let elapsed = started.elapsed();
        metrics::record_pass(context.as_str(), success, elapsed);
        tracing::info!(
            %pass_id,
            context = context.as_str(),
            success,
            elapsed_ms = elapsed.as_millis() as u64,
            "Stop pass complete"
        );
        success
    }
}

impl Default for CleanShutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CleanShutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanShutdown")
            .field("resources", &self.len())
            .field("hook", &*self.inner.hook.lock())
            .finish()
    }
}

impl Inner {
    fn stop_pass(&self, pass_id: Uuid, per_resource_timeout: Duration) -> bool {
        // One snapshot per pass: a late registration is either fully in or fully out.
        let entries = self.registry.snapshot_all();
        let watchdogs = of_kind(&entries, ResourceKind::Watchdog);
        let event_loops = of_kind(&entries, ResourceKind::EventLoop);
        let pools = of_kind(&entries, ResourceKind::WorkerPool);

        tracing::debug!(%pass_id, count = watchdogs.len(), "Releasing watchdogs");
        for watchdog in &watchdogs {
            watchdog.request_stop();
        }

        tracing::debug!(%pass_id, count = event_loops.len(), "Releasing event loop groups");
        for group in &event_loops {
            group.request_stop();
        }

        tracing::debug!(%pass_id, count = pools.len(), "Releasing worker pools");
        for pool in &pools {
            pool.request_stop();
        }

        if per_resource_timeout.is_zero() {
            return true;
        }

        let mut success = true;
        for (index, resource) in event_loops.iter().chain(pools.iter()).enumerate() {
            let kind = resource.kind();
            let reason = match resource.await_termination(per_resource_timeout) {
                Some(Ok(true)) | None => continue,
                Some(Ok(false)) => "timeout",
                Some(Err(Interrupted)) => "interrupted",
            };
            success = false;
            metrics::record_await_failure(kind, reason);
            tracing::warn!(
                %pass_id,
                %kind,
                index,
                reason,
                timeout_ms = per_resource_timeout.as_millis() as u64,
                "Resource did not terminate"
            );
        }
        success
    }

    /// Bring the hook in line with registry emptiness.
    fn reconcile_hook(self: &Arc<Self>) {
        let mut hook = self.hook.lock();
        let wanted = self.registrar.runs_hooks() && !self.registry.is_empty();

        match (*hook, wanted) {
            (None, true) => {
                let inner = Arc::clone(self);
                let id = self.registrar.install(Box::new(move || run_exit_hook(inner)));
                tracing::debug!(hook = %id, "Exit hook installed");
                *hook = Some(id);
                metrics::record_exit_hook(true);
            }
            (Some(id), false) => {
                self.registrar.remove(id);
                tracing::debug!(hook = %id, "Exit hook removed");
                *hook = None;
                metrics::record_exit_hook(false);
            }
            _ => {}
        }
    }

    fn detach_hook(&self) {
        if let Some(id) = self.hook.lock().take() {
            self.registrar.remove(id);
            tracing::debug!(hook = %id, "Exit hook removed after explicit stop pass");
            metrics::record_exit_hook(false);
        }
    }

    fn forget_hook(&self) {
        if self.hook.lock().take().is_some() {
            metrics::record_exit_hook(false);
        }
    }
}

fn of_kind(entries: &[ResourceHandle], kind: ResourceKind) -> Vec<&ResourceHandle> {
    entries.iter().filter(|e| e.kind() == kind).collect()
}

fn run_exit_hook(inner: Arc<Inner>) {
    tracing::info!("Exit hook running stop pass");
    CleanShutdown { inner }.perform_shutdown(Duration::ZERO, InvocationContext::ExitHook);
}
