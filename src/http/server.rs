//! Connection dispatch.
//!
//! # Responsibilities
//! - Run the accept loop until shutdown is signalled
//! - Give every connection its own task, bounded by the listener's permits
//! - Parse one request, route it by URI prefix, write the response
//! - Emit one access log line per connection with the status sent
//! - Release the socket on every exit path

use std::fmt::Display;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tokio::sync::broadcast;

use crate::backend::BackendConnection;
use crate::config::ServerConfig;
use crate::handlers::{FileHandler, LookupHandler};
use crate::http::request::{Request, RequestParser};
use crate::http::response::ResponseWriter;
use crate::http::status::StatusCode;
use crate::net::{ConnectionState, ConnectionTracker, Listener};

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// How long to keep reading after the response before closing.
const LINGER_TIMEOUT: Duration = Duration::from_secs(2);

/// Most unread client input discarded while lingering.
const LINGER_MAX_BYTES: usize = 64 * 1024;

/// The lookup server: one request per connection, two routes.
pub struct HttpServer {
    config: ServerConfig,
    parser: RequestParser,
    files: FileHandler,
    lookup: LookupHandler,
    tracker: ConnectionTracker,
}

impl HttpServer {
    /// Create a server over an established backend connection.
    pub fn new(config: ServerConfig, backend: Arc<BackendConnection>) -> Self {
        let parser = RequestParser::new(config.limits.max_line_bytes);
        let files = FileHandler::new(&config.web_root, &config.files);
        let lookup = LookupHandler::new(backend, &config.lookup);

        Self {
            config,
            parser,
            files,
            lookup,
            tracker: ConnectionTracker::new(),
        }
    }

    /// Live connection tracker.
    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Accept connections until `shutdown` fires, then wait for in-flight
    /// connections to finish.
    pub async fn run(
        self,
        listener: Listener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            web_root = %self.config.web_root,
            "HTTP server starting"
        );

        let server = Arc::new(self);
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer, permit)) => {
                        let server = Arc::clone(&server);
                        tokio::spawn(async move {
                            let _permit = permit;
                            server.handle_connection(stream, peer).await;
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown signal received, no longer accepting");
                    break;
                }
            }
        }

        drop(listener);
        let in_flight = server.tracker.active_count();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for open connections");
        }

        // Client reads have no timeout, so an idle peer would block this forever.
        let grace = Duration::from_secs(server.config.listener.shutdown_grace_secs);
        if tokio::time::timeout(grace, server.tracker.wait_idle()).await.is_err() {
            tracing::warn!(
                abandoned = server.tracker.active_count(),
                grace_secs = grace.as_secs(),
                "Grace period elapsed, leaving open connections behind"
            );
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve a single accepted TCP connection.
    pub async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) -> StatusCode {
        let (reader, writer) = stream.into_split();
        self.serve_connection(reader, writer, peer.ip()).await
    }

    /// Parse, route and respond over any byte stream pair.
    ///
    /// Both halves are consumed and dropped before this returns.
    pub async fn serve_connection<R, W>(&self, reader: R, writer: W, peer: impl Display) -> StatusCode
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut conn = self.tracker.track();
        let mut reader = BufReader::new(reader);
        let mut out = ResponseWriter::new(writer);

        let status = match self.parser.parse(&mut reader).await {
            Ok(request) => {
                conn.advance(ConnectionState::HeaderRead);
                conn.advance(ConnectionState::Routed);
                let status = self.route(&request, &mut out).await;
                let uri = request.uri_lossy();
                tracing::info!(
                    connection_id = %conn.id(),
                    peer = %peer,
                    method = %request.method,
                    uri = %uri,
                    version = %request.version,
                    status = status.as_u16(),
                    bytes = out.body_bytes(),
                    "{} \"{} {} {}\" {}",
                    peer,
                    request.method,
                    uri,
                    request.version,
                    status
                );
                status
            }
            Err(e) => {
                conn.advance(ConnectionState::Rejected);
                let status = e.status();
                tracing::debug!(connection_id = %conn.id(), error = %e, "Request rejected");
                if let Err(e) = out.send_status(status).await {
                    tracing::warn!(connection_id = %conn.id(), error = %e, "Failed to send rejection");
                }
                tracing::info!(
                    connection_id = %conn.id(),
                    peer = %peer,
                    status = status.as_u16(),
                    "{} \"-\" {}",
                    peer,
                    status
                );
                status
            }
        };

        if let Err(e) = out.finish().await {
            tracing::trace!(connection_id = %conn.id(), error = %e, "Close after response failed");
        }
        linger(&mut reader).await;
        status
    }

    async fn route<W>(&self, request: &Request, out: &mut ResponseWriter<W>) -> StatusCode
    where
        W: AsyncWrite + Unpin,
    {
        if request.uri.starts_with(self.config.lookup.path_prefix.as_bytes()) {
            self.lookup.serve(&request.uri, out).await
        } else {
            self.files.serve(&request.uri, out).await
        }
    }
}

/// Discard client input until it closes its side, so closing the socket with
/// unread bytes does not reset the connection before the response is read.
async fn linger<R>(reader: &mut R)
where
    R: AsyncRead + Unpin,
{
    let drain = async {
        let mut buf = [0u8; 1024];
        let mut discarded = 0;
        while discarded < LINGER_MAX_BYTES {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => discarded += n,
            }
        }
    };
    let _ = tokio::time::timeout(LINGER_TIMEOUT, drain).await;
}
