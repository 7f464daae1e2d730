//! Liveness state machine.
//!
//! # States
//! - Unknown: no verdict yet (treated as healthy)
//! - Healthy: probes succeeding
//! - Unhealthy: probes failing
//!
//! # State Transitions
//! ```text
//! Unknown/Unhealthy → Healthy: consecutive successes >= healthy_threshold
//! Unknown/Healthy → Unhealthy: consecutive failures >= unhealthy_threshold
//! ```
//!
//! # Design Decisions
//! - Hysteresis prevents flapping
//! - Counters reset on the opposite outcome
//! - Transitions are returned so the caller can log them

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Health State enum.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Unknown = 0,
    Healthy = 1,
    Unhealthy = 2,
}

impl From<u8> for HealthState {
    fn from(val: u8) -> Self {
        match val {
            1 => HealthState::Healthy,
            2 => HealthState::Unhealthy,
            _ => HealthState::Unknown,
        }
    }
}

/// Thread-safe tracker of consecutive probe outcomes.
#[derive(Debug)]
pub struct HealthTracker {
    state: AtomicU8,
    consecutive_failures: AtomicUsize,
    consecutive_successes: AtomicUsize,
    healthy_threshold: usize,
    unhealthy_threshold: usize,
}

impl HealthTracker {
    pub fn new(healthy_threshold: u32, unhealthy_threshold: u32) -> Self {
        Self {
            state: AtomicU8::new(HealthState::Unknown as u8),
            consecutive_failures: AtomicUsize::new(0),
            consecutive_successes: AtomicUsize::new(0),
            healthy_threshold: healthy_threshold.max(1) as usize,
            unhealthy_threshold: unhealthy_threshold.max(1) as usize,
        }
    }

    pub fn state(&self) -> HealthState {
        HealthState::from(self.state.load(Ordering::Relaxed))
    }

    /// True unless the tracker has reached Unhealthy.
    pub fn is_healthy(&self) -> bool {
        self.state() != HealthState::Unhealthy
    }

    /// Record a successful probe. Returns the new state on a transition.
    pub fn mark_success(&self) -> Option<HealthState> {
        self.consecutive_failures.store(0, Ordering::Relaxed);

        if self.state() == HealthState::Healthy {
            return None;
        }

        let successes = self.consecutive_successes.fetch_add(1, Ordering::Relaxed) + 1;
        if successes >= self.healthy_threshold {
            self.consecutive_successes.store(0, Ordering::Relaxed);
            self.state.store(HealthState::Healthy as u8, Ordering::Relaxed);
            return Some(HealthState::Healthy);
        }
        None
    }

    /// Record a failed probe. Returns the new state on a transition.
    pub fn mark_failure(&self) -> Option<HealthState> {
        self.consecutive_successes.store(0, Ordering::Relaxed);

        if self.state() == HealthState::Unhealthy {
            return None;
        }

        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= self.unhealthy_threshold {
            self.consecutive_failures.store(0, Ordering::Relaxed);
            self.state.store(HealthState::Unhealthy as u8, Ordering::Relaxed);
            return Some(HealthState::Unhealthy);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_gate_transitions() {
        let tracker = HealthTracker::new(2, 3);
        assert_eq!(tracker.state(), HealthState::Unknown);
        assert!(tracker.is_healthy());

        assert_eq!(tracker.mark_failure(), None);
        assert_eq!(tracker.mark_failure(), None);
        assert_eq!(tracker.mark_failure(), Some(HealthState::Unhealthy));
        assert!(!tracker.is_healthy());
        assert_eq!(tracker.mark_failure(), None);

        assert_eq!(tracker.mark_success(), None);
        assert_eq!(tracker.mark_success(), Some(HealthState::Healthy));
        assert_eq!(tracker.mark_success(), None);
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let tracker = HealthTracker::new(1, 2);
        tracker.mark_failure();
        tracker.mark_success();
        assert_eq!(tracker.mark_failure(), None);
        assert_eq!(tracker.state(), HealthState::Healthy);
        assert_eq!(tracker.mark_failure(), Some(HealthState::Unhealthy));
    }
}
