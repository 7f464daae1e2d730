//! Running stop passes off the caller's thread.
//!
//! Each request gets a dedicated, named OS thread: the pass may block on
//! resource awaits, and it must be able to start even when no async runtime
//! is available (or the runtime is itself one of the resources being stopped).

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::lifecycle::coordinator::{CleanShutdown, InvocationContext};

const WORKER_NAME: &str = "clean-shutdown";

/// Errors from scheduling a stop pass.
///
/// Resource timeouts are never errors; they surface as a `false` result.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The background worker could not be started.
    #[error("failed to start shutdown worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// The background worker exited without reporting a result.
    #[error("shutdown worker exited without a result")]
    WorkerLost,
}

impl CleanShutdown {
    /// Start a zero-timeout stop pass in the background and return immediately.
    pub fn shutdown(&self) -> Result<(), DispatchError> {
        self.dispatch(Duration::ZERO).map(drop)
    }

    /// Start a stop pass in the background that awaits each event loop group
    /// and worker pool for up to `per_resource_timeout`.
    ///
    /// The returned handle resolves to `true` iff every awaited resource
    /// terminated in time.
    pub fn shutdown_awaiting(
        &self,
        per_resource_timeout: Duration,
    ) -> Result<ShutdownHandle, DispatchError> {
        self.dispatch(per_resource_timeout)
    }

    fn dispatch(&self, per_resource_timeout: Duration) -> Result<ShutdownHandle, DispatchError> {
        let (tx, rx) = oneshot::channel();
        let coordinator = self.clone();

        thread::Builder::new()
            .name(WORKER_NAME.to_string())
            .spawn(move || {
                let success =
                    coordinator.perform_shutdown(per_resource_timeout, InvocationContext::Caller);
                // The caller may have dropped the handle.
                let _ = tx.send(success);
            })
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to start shutdown worker");
                DispatchError::Spawn(e)
            })?;

        tracing::debug!(
            timeout_ms = per_resource_timeout.as_millis() as u64,
            "Stop pass dispatched"
        );
        Ok(ShutdownHandle { rx })
    }
}

/// Pending result of a background stop pass.
///
/// Await it from async code, block on it with [`ShutdownHandle::wait`], or
/// poll it with [`ShutdownHandle::try_result`]. Dropping it does not cancel
/// the pass.
#[derive(Debug)]
#[must_use = "dropping the handle discards the stop pass result"]
pub struct ShutdownHandle {
    rx: oneshot::Receiver<bool>,
}

impl ShutdownHandle {
    /// Block the current thread until the pass completes.
    ///
    /// Must not be called from within an async execution context; await the
    /// handle there instead.
    pub fn wait(self) -> Result<bool, DispatchError> {
        self.rx.blocking_recv().map_err(|_| DispatchError::WorkerLost)
    }

    /// The result if the pass has completed, without blocking.
    pub fn try_result(&mut self) -> Option<Result<bool, DispatchError>> {
        match self.rx.try_recv() {
            Ok(success) => Some(Ok(success)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(DispatchError::WorkerLost)),
        }
    }
}

impl Future for ShutdownHandle {
    type Output = Result<bool, DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|result| result.map_err(|_| DispatchError::WorkerLost))
    }
}
