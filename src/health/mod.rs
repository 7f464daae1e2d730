//! Liveness checking subsystem.
//!
//! # Data Flow
//! ```text
//! Watchdog (watchdog.rs):
//!     Periodic timer
//!     → Run probe (bounded by timeout)
//!     → Update state.rs
//!
//! State machine (state.rs):
//!     Healthy ←→ Unhealthy
//!     With thresholds to prevent flapping
//! ```
//!
//! # Design Decisions
//! - Watchdogs are registered with the coordinator and stopped first in every
//!   stop pass, so probes don't fire against resources being torn down
//! - Stop is a flag flip; the probe loop exits at its next select point

pub mod state;
pub mod watchdog;

pub use state::{HealthState, HealthTracker};
pub use watchdog::LivenessWatchdog;
