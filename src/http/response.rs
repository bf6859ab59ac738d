//! Response emission.
//!
//! # Responsibilities
//! - Write the status line and header terminator exactly once per connection
//! - Append the generated HTML page for every non-200 status
//! - Carry handler body bytes after the status line
//!
//! # Design Decisions
//! - Every response is `HTTP/1.0`; the connection closes after the body
//! - Write failures come back as values, never panics; callers log and unwind
//! - Body bytes are only accepted once a status line has gone out

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::status::StatusCode;

/// Protocol version written on every status line.
pub const RESPONSE_VERSION: &str = "HTTP/1.0";

/// Error type for response writes.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The peer went away or the socket failed.
    #[error("write to client failed: {0}")]
    Io(#[from] std::io::Error),

    /// A second status line was requested for the same connection.
    #[error("status {0} already sent")]
    StatusAlreadySent(StatusCode),

    /// Body bytes were written before any status line.
    #[error("body written before status line")]
    StatusNotSent,
}

/// Serialize the status line, blank line and optional error page.
pub fn status_head(status: StatusCode) -> String {
    let mut head = format!(
        "{} {} {}\r\n\r\n",
        RESPONSE_VERSION,
        status.as_u16(),
        status.reason()
    );
    if let Some(body) = status.error_body() {
        head.push_str(&body);
    }
    head
}

/// Writes one response onto a client connection.
pub struct ResponseWriter<W> {
    inner: W,
    status: Option<StatusCode>,
    body_bytes: u64,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            status: None,
            body_bytes: 0,
        }
    }

    /// Send the status line. Must be the first write on the connection.
    ///
    /// The status is recorded even when the write fails, so the access log
    /// reports what the handler chose.
    pub async fn send_status(&mut self, status: StatusCode) -> Result<(), ResponseError> {
        if let Some(sent) = self.status {
            return Err(ResponseError::StatusAlreadySent(sent));
        }
        self.status = Some(status);

        self.inner.write_all(status_head(status).as_bytes()).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Append raw body bytes after the status line.
    pub async fn write_body(&mut self, bytes: &[u8]) -> Result<(), ResponseError> {
        if self.status.is_none() {
            return Err(ResponseError::StatusNotSent);
        }
        self.inner.write_all(bytes).await?;
        self.body_bytes += bytes.len() as u64;
        Ok(())
    }

    /// Convenience wrapper for markup.
    pub async fn write_html(&mut self, html: &str) -> Result<(), ResponseError> {
        self.write_body(html.as_bytes()).await
    }

    /// Flush and half-close the write side.
    pub async fn finish(&mut self) -> Result<(), ResponseError> {
        self.inner.flush().await?;
        self.inner.shutdown().await?;
        Ok(())
    }

    /// Status sent so far, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Handler body bytes written after the status line.
    pub fn body_bytes(&self) -> u64 {
        self.body_bytes
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn success_has_no_body() {
        let mut writer = ResponseWriter::new(Vec::new());
        writer.send_status(StatusCode::OK).await.unwrap();
        assert_eq!(writer.into_inner(), b"HTTP/1.0 200 OK\r\n\r\n");
    }

    #[tokio::test]
    async fn error_status_carries_html_page() {
        let mut writer = ResponseWriter::new(Vec::new());
        writer.send_status(StatusCode::NOT_IMPLEMENTED).await.unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert_eq!(
            out,
            "HTTP/1.0 501 Not Implemented\r\n\r\n\
             <html><body>\n<h1>501 Not Implemented</h1>\n</body></html>\n"
        );
    }

    #[tokio::test]
    async fn second_status_is_refused() {
        let mut writer = ResponseWriter::new(Vec::new());
        writer.send_status(StatusCode::OK).await.unwrap();

        let err = writer.send_status(StatusCode::NOT_FOUND).await.unwrap_err();
        assert!(matches!(err, ResponseError::StatusAlreadySent(StatusCode::OK)));
        assert_eq!(writer.status(), Some(StatusCode::OK));
    }

    #[tokio::test]
    async fn body_requires_status() {
        let mut writer = ResponseWriter::new(Vec::new());
        let err = writer.write_html("<p>").await.unwrap_err();
        assert!(matches!(err, ResponseError::StatusNotSent));

        writer.send_status(StatusCode::OK).await.unwrap();
        writer.write_html("<p>").await.unwrap();
        assert_eq!(writer.body_bytes(), 3);
    }

    #[tokio::test]
    async fn write_failure_is_reported() {
        let (client, server) = tokio::io::duplex(64);
        drop(client);

        let mut writer = ResponseWriter::new(server);
        let err = writer.send_status(StatusCode::OK).await.unwrap_err();
        assert!(matches!(err, ResponseError::Io(_)));
        assert_eq!(writer.status(), Some(StatusCode::OK));
    }
}
