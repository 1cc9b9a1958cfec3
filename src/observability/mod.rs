//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging via tracing; request ID flows through log lines
//! - Metrics are cheap (atomic increments)
//! - A degraded relay response is indistinguishable from a healthy one on
//!   the wire, so logs and metrics are the only place the difference shows

pub mod logging;
pub mod metrics;
