//! Request line parsing and validation.
//!
//! # Responsibilities
//! - Read exactly one request line and split it into method, URI, version
//! - Enforce the supported method, versions and URI shape
//! - Reject path traversal before any handler runs
//! - Consume and discard header lines up to the blank line
//!
//! # Design Decisions
//! - Checks run in a fixed order; the first failure decides the status
//! - Parsing never panics: every outcome is a `Request` or a `RequestError`
//!   that maps to the status the caller must send
//! - Lines are read with a byte bound so a client cannot grow the buffer
//! - The URI stays raw bytes: it names files and lookup keys exactly as sent

use std::borrow::Cow;
use std::fmt;

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::http::status::StatusCode;

/// The only method the server implements.
pub const METHOD_GET: &str = "GET";

/// Bytes that separate request line tokens.
const DELIMITERS: &[u8] = b" \t\r\n";

/// Supported protocol versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

impl Version {
    pub fn parse(token: &[u8]) -> Option<Self> {
        match token {
            b"HTTP/1.0" => Some(Version::Http10),
            b"HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request. Headers are not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    /// Request target exactly as received, not necessarily UTF-8.
    pub uri: Vec<u8>,
    pub version: Version,
}

impl Request {
    /// The URI for display, with invalid UTF-8 replaced.
    pub fn uri_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.uri)
    }
}

/// Why a request was rejected.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("connection closed before a request line arrived")]
    NoRequestLine,

    #[error("failed to read request: {0}")]
    Io(#[from] std::io::Error),

    #[error("request line exceeds {0} bytes")]
    LineTooLong(usize),

    #[error("request line has {0} tokens, expected 3")]
    Malformed(usize),

    #[error("method {0:?} not implemented")]
    UnsupportedMethod(String),

    #[error("version {0:?} not supported")]
    UnsupportedVersion(String),

    #[error("URI {0:?} does not start with '/'")]
    InvalidUri(String),

    #[error("URI {0:?} contains a traversal segment")]
    Traversal(String),

    #[error("connection closed inside the header block")]
    TruncatedHeaders,
}

impl RequestError {
    /// Status the client receives for this rejection.
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::Malformed(_)
            | RequestError::UnsupportedMethod(_)
            | RequestError::UnsupportedVersion(_) => StatusCode::NOT_IMPLEMENTED,
            RequestError::NoRequestLine
            | RequestError::Io(_)
            | RequestError::LineTooLong(_)
            | RequestError::InvalidUri(_)
            | RequestError::Traversal(_)
            | RequestError::TruncatedHeaders => StatusCode::BAD_REQUEST,
        }
    }
}

/// True when the URI ends in `/..` or contains `/../`.
///
/// This is a literal substring test, not a canonicalization.
pub fn is_traversal(uri: &[u8]) -> bool {
    uri.ends_with(b"/..") || uri.windows(4).any(|w| w == b"/../")
}

/// One bounded read from the connection.
enum Line {
    /// Stream ended before any byte.
    Eof,
    /// Ended in `\n`, or in end of stream.
    Complete(Vec<u8>),
    /// The byte bound was reached before `\n`.
    Truncated,
}

/// Reads one request off a connection.
#[derive(Debug, Clone)]
pub struct RequestParser {
    max_line_bytes: usize,
}

impl RequestParser {
    pub fn new(max_line_bytes: usize) -> Self {
        Self { max_line_bytes }
    }

    /// Parse the request line and skip the header block.
    pub async fn parse<R>(&self, reader: &mut R) -> Result<Request, RequestError>
    where
        R: AsyncBufRead + Unpin,
    {
        let line = match self.read_line(reader).await? {
            Line::Eof => return Err(RequestError::NoRequestLine),
            Line::Truncated => return Err(RequestError::LineTooLong(self.max_line_bytes)),
            Line::Complete(line) => line,
        };
        let request = parse_request_line(&line)?;

        self.skip_headers(reader).await?;
        Ok(request)
    }

    async fn skip_headers<R>(&self, reader: &mut R) -> Result<(), RequestError>
    where
        R: AsyncBufRead + Unpin,
    {
        // A piece following a truncated read continues the same header line.
        let mut continuation = false;
        loop {
            match self.read_line(reader).await {
                Ok(Line::Eof) | Err(_) => return Err(RequestError::TruncatedHeaders),
                Ok(Line::Truncated) => continuation = true,
                Ok(Line::Complete(line)) => {
                    if !continuation && (line == b"\r\n" || line == b"\n") {
                        return Ok(());
                    }
                    continuation = false;
                }
            }
        }
    }

    async fn read_line<R>(&self, reader: &mut R) -> std::io::Result<Line>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut buf = Vec::new();
        let n = (&mut *reader)
            .take(self.max_line_bytes as u64)
            .read_until(b'\n', &mut buf)
            .await?;

        Ok(if n == 0 {
            Line::Eof
        } else if buf.ends_with(b"\n") || n < self.max_line_bytes {
            Line::Complete(buf)
        } else {
            Line::Truncated
        })
    }
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new(8192)
    }
}

fn lossy(token: &[u8]) -> String {
    String::from_utf8_lossy(token).into_owned()
}

/// Validate a single request line.
pub fn parse_request_line(line: &[u8]) -> Result<Request, RequestError> {
    let tokens: Vec<&[u8]> = line
        .split(|b| DELIMITERS.contains(b))
        .filter(|token| !token.is_empty())
        .collect();

    let &[method, uri, version] = tokens.as_slice() else {
        return Err(RequestError::Malformed(tokens.len()));
    };

    if method != METHOD_GET.as_bytes() {
        return Err(RequestError::UnsupportedMethod(lossy(method)));
    }
    let version =
        Version::parse(version).ok_or_else(|| RequestError::UnsupportedVersion(lossy(version)))?;
    if !uri.starts_with(b"/") {
        return Err(RequestError::InvalidUri(lossy(uri)));
    }
    if is_traversal(uri) {
        return Err(RequestError::Traversal(lossy(uri)));
    }

    Ok(Request {
        method: METHOD_GET.to_string(),
        uri: uri.to_vec(),
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse(input: &[u8]) -> Result<Request, RequestError> {
        let mut reader = input;
        RequestParser::default().parse(&mut reader).await
    }

    #[tokio::test]
    async fn accepts_simple_get() {
        let request = parse(b"GET /index.html HTTP/1.0\r\n\r\n").await.unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.uri, b"/index.html");
        assert_eq!(request.version, Version::Http10);
    }

    #[tokio::test]
    async fn skips_headers() {
        let input = b"GET / HTTP/1.1\r\nHost: localhost\r\nAccept: */*\r\n\r\nignored body";
        let request = parse(input).await.unwrap();
        assert_eq!(request.uri, b"/");
        assert_eq!(request.version, Version::Http11);
    }

    #[tokio::test]
    async fn bare_newlines_and_tabs() {
        let request = parse(b"GET\t/a.txt\tHTTP/1.1\nX: y\n\n").await.unwrap();
        assert_eq!(request.uri, b"/a.txt");
    }

    #[tokio::test]
    async fn empty_stream_is_bad_request() {
        let err = parse(b"").await.unwrap_err();
        assert!(matches!(err, RequestError::NoRequestLine));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_token_count_is_not_implemented() {
        let lines: [&[u8]; 3] = [
            b"GET /\r\n\r\n",
            b"GET / HTTP/1.0 extra\r\n\r\n",
            b"\r\n\r\n",
        ];
        for line in lines {
            let err = parse(line).await.unwrap_err();
            assert_eq!(err.status(), StatusCode::NOT_IMPLEMENTED, "{:?}", line);
        }
    }

    #[tokio::test]
    async fn other_methods_are_not_implemented() {
        for method in ["POST", "HEAD", "get", "DELETE"] {
            let line = format!("{} / HTTP/1.0\r\n\r\n", method);
            let err = parse(line.as_bytes()).await.unwrap_err();
            assert!(matches!(err, RequestError::UnsupportedMethod(_)));
            assert_eq!(err.status(), StatusCode::NOT_IMPLEMENTED);
        }
    }

    #[tokio::test]
    async fn other_versions_are_not_implemented() {
        let err = parse(b"GET / HTTP/2.0\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, RequestError::UnsupportedVersion(_)));
        assert_eq!(err.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn method_is_checked_before_uri() {
        let err = parse(b"PUT relative HTTP/1.0\r\n\r\n").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn relative_uri_is_bad_request() {
        let err = parse(b"GET index.html HTTP/1.0\r\n\r\n").await.unwrap_err();
        assert!(matches!(err, RequestError::InvalidUri(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn traversal_is_bad_request() {
        for uri in ["/..", "/../etc/passwd", "/a/../../b", "/docs/.."] {
            let line = format!("GET {} HTTP/1.0\r\n\r\n", uri);
            let err = parse(line.as_bytes()).await.unwrap_err();
            assert!(matches!(err, RequestError::Traversal(_)), "{}", uri);
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn traversal_check_is_literal() {
        assert!(is_traversal(b"/a/../b"));
        assert!(is_traversal(b"/a/.."));
        assert!(!is_traversal(b"/a/..b"));
        assert!(!is_traversal(b"/a..b/c"));
        assert!(!is_traversal(b"/..."));
    }

    #[tokio::test]
    async fn non_utf8_uri_is_kept_verbatim() {
        let request = parse(b"GET /mdb-lookup?key=caf\xe9 HTTP/1.0\r\n\r\n").await.unwrap();
        assert_eq!(request.uri, b"/mdb-lookup?key=caf\xe9");
        assert_eq!(request.uri_lossy(), "/mdb-lookup?key=caf\u{fffd}");
    }

    #[tokio::test]
    async fn missing_blank_line_is_bad_request() {
        let err = parse(b"GET / HTTP/1.0\r\nHost: x\r\n").await.unwrap_err();
        assert!(matches!(err, RequestError::TruncatedHeaders));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn overlong_request_line_is_bad_request() {
        let uri = "a".repeat(200);
        let line = format!("GET /{} HTTP/1.0\r\n\r\n", uri);
        let mut reader = line.as_bytes();
        let err = RequestParser::new(64).parse(&mut reader).await.unwrap_err();
        assert!(matches!(err, RequestError::LineTooLong(64)));
    }

    #[tokio::test]
    async fn overlong_header_is_discarded() {
        let cookie = "c".repeat(300);
        let input = format!("GET / HTTP/1.0\r\nCookie: {}\r\n\r\n", cookie);
        let mut reader = input.as_bytes();
        let request = RequestParser::new(64).parse(&mut reader).await.unwrap();
        assert_eq!(request.uri, b"/");
    }
}
