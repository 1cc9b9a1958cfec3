//! Upstream health monitoring subsystem.
//!
//! # Data Flow
//! ```text
//! active probes (monitor.rs) ──┐
//!                              ├──▶ state.rs (hysteresis state machine)
//! relay outcomes (passive) ────┘         → logs + health gauge
//! ```
//!
//! # Design Decisions
//! - Health state never gates forwarding; every request still attempts
//!   the upstream
//! - Hysteresis prevents flapping

pub mod monitor;
pub mod state;

pub use monitor::HealthMonitor;
pub use state::{HealthState, UpstreamStatus};
