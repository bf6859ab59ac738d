//! Request handlers.
//!
//! # Data Flow
//! ```text
//! validated Request
//!     → lookup.rs (URI starts with the lookup prefix)
//!         → backend channel → HTML table
//!     → file.rs (everything else)
//!         → web root → file bytes
//! ```
//!
//! Both handlers write their own status line through the `ResponseWriter`
//! and return the status they sent.

pub mod file;
pub mod lookup;

pub use file::FileHandler;
pub use lookup::LookupHandler;
