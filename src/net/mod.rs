//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind with backlog, accept, connection limits)
//!     → connection.rs (lifecycle tracking, state machine)
//!     → Hand off to HTTP layer
//!
//! Connection States:
//!     Accepted → HeaderRead → Routed → Closed
//!     Accepted → Rejected → Closed
//! ```
//!
//! # Design Decisions
//! - Semaphore-bounded accept prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - One request per connection; the socket closes after the response

pub mod connection;
pub mod listener;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionState, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
