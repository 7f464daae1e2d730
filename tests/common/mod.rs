//! Scripted resources for coordinator tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clean_shutdown::{EventLoopGroup, Interrupted, Watchdog, WorkerPool};
use parking_lot::Mutex;

/// Shared, ordered record of resource calls.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

/// How a scripted resource behaves when awaited.
#[derive(Clone, Copy)]
pub enum Termination {
    /// Terminates this long after the stop request.
    After(Duration),
    /// Never terminates.
    Never,
    /// Every await is interrupted.
    Interrupted,
}

/// An event loop group or worker pool with scripted termination.
pub struct ScriptedResource {
    name: String,
    journal: Journal,
    termination: Termination,
    signalled_at: Mutex<Option<Instant>>,
    pub stop_requests: AtomicUsize,
    pub awaits: AtomicUsize,
}

impl ScriptedResource {
    pub fn new(name: &str, journal: &Journal, termination: Termination) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            journal: journal.clone(),
            termination,
            signalled_at: Mutex::new(None),
            stop_requests: AtomicUsize::new(0),
            awaits: AtomicUsize::new(0),
        })
    }

    fn request(&self, what: &str) {
        self.stop_requests.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("{}:{}", self.name, what));
        let mut at = self.signalled_at.lock();
        if at.is_none() {
            *at = Some(Instant::now());
        }
    }

    fn wait(&self, timeout: Duration) -> Result<bool, Interrupted> {
        self.awaits.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("{}:await", self.name));
        match self.termination {
            Termination::Interrupted => Err(Interrupted),
            Termination::Never => {
                thread::sleep(timeout);
                Ok(false)
            }
            Termination::After(delay) => {
                let Some(signalled) = *self.signalled_at.lock() else {
                    thread::sleep(timeout);
                    return Ok(false);
                };
                let remaining = delay.saturating_sub(signalled.elapsed());
                if remaining <= timeout {
                    thread::sleep(remaining);
                    Ok(true)
                } else {
                    thread::sleep(timeout);
                    Ok(false)
                }
            }
        }
    }
}

impl EventLoopGroup for ScriptedResource {
    fn shutdown_gracefully(&self) {
        self.request("shutdown_gracefully");
    }

    fn await_termination(&self, timeout: Duration) -> Result<bool, Interrupted> {
        self.wait(timeout)
    }
}

impl WorkerPool for ScriptedResource {
    fn shutdown(&self) {
        self.request("shutdown");
    }

    fn await_termination(&self, timeout: Duration) -> Result<bool, Interrupted> {
        self.wait(timeout)
    }
}

/// A watchdog that journals its stops and optionally runs a callback.
pub struct ScriptedWatchdog {
    name: String,
    journal: Journal,
    on_stop: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    pub stops: AtomicUsize,
}

impl ScriptedWatchdog {
    pub fn new(name: &str, journal: &Journal) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            journal: journal.clone(),
            on_stop: Mutex::new(None),
            stops: AtomicUsize::new(0),
        })
    }

    /// Run `f` (once) the next time the watchdog is stopped.
    pub fn on_stop(&self, f: impl FnOnce() + Send + 'static) {
        *self.on_stop.lock() = Some(Box::new(f));
    }
}

impl Watchdog for ScriptedWatchdog {
    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.journal.record(format!("{}:stop", self.name));
        let callback = self.on_stop.lock().take();
        if let Some(f) = callback {
            f();
        }
    }
}
