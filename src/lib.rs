//! lookup-httpd: a small HTTP/1.0 server with two routes.
//!
//! Static files are served from a web root; URIs under `/mdb-lookup` are
//! bridged to a line-oriented lookup backend over one persistent TCP
//! connection and rendered as an HTML table.

pub mod backend;
pub mod config;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use backend::BackendConnection;
pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
