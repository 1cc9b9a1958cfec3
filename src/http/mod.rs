//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, shutdown)
//!     → relay.rs (tolerant parse, forward, stream or degrade)
//!     → response.rs (event-stream headers, fallback payload)
//!     → Send to client
//! ```

pub mod relay;
pub mod response;
pub mod server;

pub use relay::{RelayError, RelayOutcome};
pub use response::FALLBACK_MESSAGE;
pub use server::HttpServer;
