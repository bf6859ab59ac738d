//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, per-connection task)
//!     → request.rs (request line, validation, header skip)
//!     → [handlers decide the status and body]
//!     → response.rs (status line, error page, body bytes)
//!     → status.rs (reason phrases)
//!     → Send to client, close
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod status;

pub use request::{Request, RequestError, RequestParser, Version};
pub use response::{ResponseError, ResponseWriter};
pub use server::HttpServer;
pub use status::StatusCode;
