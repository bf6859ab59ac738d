//! Lookup backend subsystem.
//!
//! # Data Flow
//! ```text
//! startup
//!     → connection.rs (resolve host, connect once)
//!     → Arc<BackendConnection> shared with the lookup handler
//!
//! per lookup request:
//!     lock channel → write key → read rows until sentinel → unlock
//! ```
//!
//! # Design Decisions
//! - One TCP stream for the life of the process; no pool, no reconnect
//! - A mutex serializes inquiries, since replies carry no identifiers
//! - No timeouts or retries: a stalled backend stalls lookups only
//! - A failed read or write marks the channel broken for good

pub mod connection;

use thiserror::Error;

pub use connection::{BackendConnection, LookupSession};

/// Errors talking to the lookup backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The startup connection could not be established.
    #[error("failed to connect to backend {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// A read or write on the established stream failed.
    #[error("backend I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend closed the stream before the result sentinel.
    #[error("backend connection terminated")]
    Closed,

    /// An earlier failure left the channel unusable.
    #[error("backend connection unavailable")]
    Unavailable,
}
