//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Parse args → Load config → Validate → Connect backend → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections (bounded by
//!     listener.shutdown_grace_secs) → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     Second SIGTERM/SIGINT → Exit immediately
//! ```
//!
//! # Design Decisions
//! - Ordered startup: backend connection before the listener, as lookups
//!   cannot be served without it
//! - Fail fast: any startup error is fatal
//! - After startup nothing is fatal; failures stay scoped to one connection

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{shutdown_signal, spawn_signal_watcher};
