//! lookup-httpd
//!
//! ```text
//!                     ┌────────────────────────────────────────────┐
//!   Client request    │                lookup-httpd                │
//!  ───────────────────┼─▶ net::Listener ─▶ http::server            │
//!                     │                      │                     │
//!                     │                 http::request              │
//!                     │                      │                     │
//!                     │         ┌────────────┴───────────┐         │
//!                     │         ▼                        ▼         │
//!                     │  handlers::file          handlers::lookup ─┼──▶ lookup backend
//!                     │   (web root)                 (HTML table) ◀┼─── (one TCP stream)
//!                     │         │                        │         │
//!  ◀──────────────────┼─────────┴── http::response ◀─────┘         │
//!   Client response   │                                            │
//!                     └────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use lookup_httpd::config::{read_config, validate_config, ConfigError, ServerConfig};
use lookup_httpd::lifecycle::{spawn_signal_watcher, Shutdown};
use lookup_httpd::net::Listener;
use lookup_httpd::observability::init_logging;
use lookup_httpd::{BackendConnection, HttpServer};

#[derive(Parser, Debug)]
#[command(name = "lookup-httpd", version)]
#[command(about = "Static file server with an mdb-lookup backend bridge", long_about = None)]
struct Cli {
    /// Port to listen on
    server_port: u16,

    /// Directory served for non-lookup URIs
    web_root: String,

    /// Host running the lookup backend
    mdb_lookup_host: String,

    /// Port of the lookup backend
    mdb_lookup_port: u16,

    /// Optional TOML file with tuning settings
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ServerConfig::default(),
        };

        config.listener.port = self.server_port;
        config.web_root = self.web_root;
        config.backend.host = self.mdb_lookup_host;
        config.backend.port = self.mdb_lookup_port;

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().into_config()?;

    init_logging(&config.observability)?;
    tracing::info!("lookup-httpd v{} starting", env!("CARGO_PKG_VERSION"));

    if !std::path::Path::new(&config.web_root).is_dir() {
        tracing::warn!(web_root = %config.web_root, "Web root is not a directory");
    }

    tracing::info!(
        port = config.listener.port,
        web_root = %config.web_root,
        backend_host = %config.backend.host,
        backend_port = config.backend.port,
        max_connections = config.listener.max_connections,
        "Configuration loaded"
    );

    // The backend must be reachable before any client is accepted.
    let backend = BackendConnection::connect(&config.backend.host, config.backend.port)
        .await?
        .with_max_row_bytes(config.limits.max_line_bytes);
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    spawn_signal_watcher(shutdown);

    let server = HttpServer::new(config, Arc::new(backend));
    server.run(listener, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
