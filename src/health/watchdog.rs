//! Periodic liveness watchdog.
//!
//! # Responsibilities
//! - Periodically run a probe against something that can die (a connection,
//!   a peer, a child process)
//! - Feed probe outcomes into a HealthTracker
//! - Stop immediately when the coordinator asks

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::time;

use crate::config::WatchdogConfig;
use crate::health::state::{HealthState, HealthTracker};
use crate::observability::metrics;
use crate::resource::Watchdog;

/// A running liveness watchdog.
pub struct LivenessWatchdog {
    name: String,
    tracker: Arc<HealthTracker>,
    stop_tx: watch::Sender<bool>,
}

impl LivenessWatchdog {
    /// Start probing on `handle` every `config.interval_ms`.
    ///
    /// A probe that does not finish within `config.timeout_ms` counts as a failure.
    pub fn spawn<P, Fut>(
        name: impl Into<String>,
        config: &WatchdogConfig,
        handle: &Handle,
        probe: P,
    ) -> Arc<Self>
    where
        P: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let name = name.into();
        let tracker = Arc::new(HealthTracker::new(
            config.healthy_threshold,
            config.unhealthy_threshold,
        ));
        let (stop_tx, stop_rx) = watch::channel(false);

        let task = ProbeLoop {
            name: name.clone(),
            tracker: tracker.clone(),
            interval: Duration::from_millis(config.interval_ms.max(1)),
            timeout: Duration::from_millis(config.timeout_ms.max(1)),
        };
        handle.spawn(task.run(probe, stop_rx));

        Arc::new(Self {
            name,
            tracker,
            stop_tx,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> HealthState {
        self.tracker.state()
    }

    pub fn is_healthy(&self) -> bool {
        self.tracker.is_healthy()
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }
}

impl Watchdog for LivenessWatchdog {
    fn stop(&self) {
        if !self.stop_tx.send_replace(true) {
            tracing::debug!(watchdog = %self.name, "Watchdog stopped");
        }
    }
}

struct ProbeLoop {
    name: String,
    tracker: Arc<HealthTracker>,
    interval: Duration,
    timeout: Duration,
}

impl ProbeLoop {
    async fn run<P, Fut>(self, probe: P, mut stop: watch::Receiver<bool>)
    where
        P: Fn() -> Fut,
        Fut: Future<Output = bool>,
    {
        tracing::info!(
            watchdog = %self.name,
            interval_ms = self.interval.as_millis() as u64,
            "Watchdog starting"
        );

        let mut ticker = time::interval(self.interval);
        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    // A stop raced with the tick; don't probe a resource being torn down.
                    if *stop.borrow() {
                        break;
                    }
                    let healthy = matches!(time::timeout(self.timeout, probe()).await, Ok(true));
                    self.record(healthy);
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!(watchdog = %self.name, "Watchdog loop exited");
    }

    fn record(&self, healthy: bool) {
        let transition = if healthy {
            self.tracker.mark_success()
        } else {
            self.tracker.mark_failure()
        };

        match transition {
            Some(HealthState::Unhealthy) => {
                tracing::warn!(watchdog = %self.name, "Liveness lost")
            }
            Some(state) => tracing::info!(watchdog = %self.name, ?state, "Liveness restored"),
            None => {}
        }
        metrics::record_watchdog_health(&self.name, self.tracker.is_healthy());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    fn fast_config() -> WatchdogConfig {
        WatchdogConfig {
            interval_ms: 5,
            timeout_ms: 5,
            unhealthy_threshold: 2,
            healthy_threshold: 1,
        }
    }

    #[tokio::test]
    async fn test_detects_lost_liveness() {
        let alive = Arc::new(AtomicBool::new(true));
        let a = alive.clone();
        let watchdog = LivenessWatchdog::spawn("peer", &fast_config(), &Handle::current(), move || {
            let a = a.clone();
            async move { a.load(Ordering::SeqCst) }
        });

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(watchdog.state(), HealthState::Healthy);

        alive.store(false, Ordering::SeqCst);
        time::sleep(Duration::from_millis(80)).await;
        assert_eq!(watchdog.state(), HealthState::Unhealthy);
        watchdog.stop();
    }

    #[tokio::test]
    async fn test_slow_probe_counts_as_failure() {
        let watchdog = LivenessWatchdog::spawn("slow", &fast_config(), &Handle::current(), || async {
            time::sleep(Duration::from_millis(50)).await;
            true
        });

        time::sleep(Duration::from_millis(200)).await;
        assert!(!watchdog.is_healthy());
        watchdog.stop();
    }

    #[tokio::test]
    async fn test_stop_halts_probing() {
        let probes = Arc::new(AtomicUsize::new(0));
        let p = probes.clone();
        let watchdog = LivenessWatchdog::spawn("counted", &fast_config(), &Handle::current(), move || {
            p.fetch_add(1, Ordering::SeqCst);
            async { true }
        });

        time::sleep(Duration::from_millis(30)).await;
        watchdog.stop();
        watchdog.stop();
        assert!(watchdog.is_stopped());

        time::sleep(Duration::from_millis(10)).await;
        let after_stop = probes.load(Ordering::SeqCst);
        time::sleep(Duration::from_millis(40)).await;
        assert_eq!(probes.load(Ordering::SeqCst), after_stop);
    }
}
