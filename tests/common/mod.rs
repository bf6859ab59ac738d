//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use lookup_httpd::config::ServerConfig;
use lookup_httpd::net::Listener;
use lookup_httpd::{BackendConnection, HttpServer, Shutdown};

/// A line-protocol backend that answers each key with the rows `reply` returns.
pub struct MockBackend {
    pub addr: SocketAddr,
    keys: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl MockBackend {
    /// Keys received so far, in order, as text.
    pub fn keys(&self) -> Vec<String> {
        self.raw_keys()
            .iter()
            .map(|key| String::from_utf8_lossy(key).into_owned())
            .collect()
    }

    /// Keys received so far, exactly as read off the wire.
    pub fn raw_keys(&self) -> Vec<Vec<u8>> {
        self.keys.lock().unwrap().clone()
    }
}

/// Start a mock backend. It serves the single persistent connection the
/// server opens at startup.
pub async fn start_mock_backend<F>(reply: F) -> MockBackend
where
    F: Fn(&str) -> Vec<String> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let keys = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&keys);

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        loop {
            let mut key = Vec::new();
            match reader.read_until(b'\n', &mut key).await {
                Ok(n) if n > 0 && key.ends_with(b"\n") => {}
                _ => break,
            }
            key.pop();
            seen.lock().unwrap().push(key.clone());

            let mut out = String::new();
            for row in reply(&String::from_utf8_lossy(&key)) {
                out.push_str(&row);
                out.push('\n');
            }
            out.push('\n');
            if writer.write_all(out.as_bytes()).await.is_err() {
                break;
            }
        }
    });

    MockBackend { addr, keys }
}

/// A running server on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: tokio::task::JoinHandle<Result<(), std::io::Error>>,
}

/// Start the server against `web_root` and a backend at `backend_addr`.
pub async fn start_server(web_root: &Path, backend_addr: SocketAddr) -> TestServer {
    start_server_with(web_root, backend_addr, |_| {}).await
}

/// Like [`start_server`], with a hook to adjust the config first.
pub async fn start_server_with<F>(web_root: &Path, backend_addr: SocketAddr, adjust: F) -> TestServer
where
    F: FnOnce(&mut ServerConfig),
{
    let mut config = ServerConfig::default();
    config.listener.bind_address = "127.0.0.1".to_string();
    config.listener.port = 0;
    config.web_root = web_root.display().to_string();
    config.backend.host = backend_addr.ip().to_string();
    config.backend.port = backend_addr.port();
    adjust(&mut config);

    let backend = BackendConnection::connect(&config.backend.host, config.backend.port)
        .await
        .unwrap()
        .with_max_row_bytes(config.limits.max_line_bytes);
    let listener = Listener::bind(&config.listener).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let server = HttpServer::new(config, Arc::new(backend));
    let handle = tokio::spawn(async move { server.run(listener, rx).await });

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Send raw request bytes and read until the server closes.
pub async fn send_raw(addr: SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut response))
        .await
        .expect("server did not close the connection")
        .unwrap();
    response
}

/// `GET <uri> HTTP/1.0` with no headers.
pub async fn get(addr: SocketAddr, uri: &str) -> Vec<u8> {
    send_raw(addr, format!("GET {} HTTP/1.0\r\n\r\n", uri).as_bytes()).await
}

/// Split a response into its status line and everything after the blank line.
pub fn split_response(response: &[u8]) -> (String, Vec<u8>) {
    let end = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("missing header terminator");
    let status_line = String::from_utf8_lossy(&response[..end]).into_owned();
    (status_line, response[end + 4..].to_vec())
}
