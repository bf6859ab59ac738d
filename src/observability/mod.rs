//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!
//! Consumers:
//!     → logging.rs (fmt or JSON subscriber on stderr/stdout)
//! ```
//!
//! # Design Decisions
//! - Structured fields (peer, uri, status) on every access line
//! - Connection ID flows through all events for one connection
//! - The access line keeps the classic `ip "GET /uri HTTP/1.0" 200 OK` shape

pub mod logging;

pub use logging::init_logging;
