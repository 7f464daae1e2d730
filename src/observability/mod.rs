//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Coordinator, adapters and watchdogs produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Every stop pass carries a correlation ID in its log fields
//! - Metrics go through the `metrics` facade; the binary picks the exporter

pub mod logging;
pub mod metrics;
