//! Lifecycle subsystem: shutdown coordination.
//!
//! # Design Decisions
//! - One broadcast channel fans the shutdown signal out to every
//!   long-running task (server, health monitor)
//! - OS signals and programmatic triggers share the same path

pub mod shutdown;

pub use shutdown::Shutdown;
