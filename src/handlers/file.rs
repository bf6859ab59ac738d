//! Static file serving.
//!
//! # Responsibilities
//! - Map a request URI onto a path under the web root
//! - Refuse directories (403) and unopenable paths (404)
//! - Stream file bytes to the client in bounded chunks

use std::path::{Component, Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite};

use crate::config::FilesConfig;
use crate::http::request::is_traversal;
use crate::http::response::ResponseWriter;
use crate::http::status::StatusCode;

/// Serves files from a single root directory.
#[derive(Debug, Clone)]
pub struct FileHandler {
    root: PathBuf,
    index_file: String,
    chunk_size: usize,
}

impl FileHandler {
    pub fn new(root: impl Into<PathBuf>, config: &FilesConfig) -> Self {
        Self {
            root: root.into(),
            index_file: config.index_file.clone(),
            chunk_size: config.chunk_size.max(1),
        }
    }

    /// Resolve `uri` to a path under the root.
    ///
    /// The URI is used verbatim: no percent-decoding, and a query string is
    /// part of the file name. Returns `None` for traversal attempts.
    pub fn resolve(&self, uri: &[u8]) -> Option<PathBuf> {
        if is_traversal(uri) {
            return None;
        }

        let start = uri.iter().position(|&b| b != b'/').unwrap_or(uri.len());
        let relative = bytes_to_path(&uri[start..])?;
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return None;
        }

        let mut path = self.root.join(relative);
        if uri.ends_with(b"/") {
            path.push(&self.index_file);
        }
        Some(path)
    }

    /// Send the file named by `uri`. Returns the status actually sent.
    pub async fn serve<W>(&self, uri: &[u8], out: &mut ResponseWriter<W>) -> StatusCode
    where
        W: AsyncWrite + Unpin,
    {
        let Some(path) = self.resolve(uri) else {
            tracing::debug!(uri = %String::from_utf8_lossy(uri), "Rejected file path");
            return send_only(out, StatusCode::BAD_REQUEST).await;
        };

        if let Ok(meta) = tokio::fs::metadata(&path).await {
            if meta.is_dir() {
                return send_only(out, StatusCode::FORBIDDEN).await;
            }
        }

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "File not available");
                return send_only(out, StatusCode::NOT_FOUND).await;
            }
        };

        let status = StatusCode::OK;
        if let Err(e) = out.send_status(status).await {
            tracing::warn!(error = %e, "Failed to send status line");
            return status;
        }

        match self.copy(file, out).await {
            Ok(bytes) => tracing::trace!(path = %path.display(), bytes, "File sent"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "File transfer aborted"),
        }
        status
    }

    async fn copy<W>(&self, mut file: File, out: &mut ResponseWriter<W>) -> Result<u64, CopyError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; self.chunk_size];
        let mut total = 0u64;
        loop {
            let n = file.read(&mut buf).await.map_err(CopyError::Read)?;
            if n == 0 {
                return Ok(total);
            }
            out.write_body(&buf[..n]).await.map_err(CopyError::Write)?;
            total += n as u64;
        }
    }
}

/// File names are bytes on Unix, so any URI maps onto a path.
#[cfg(unix)]
fn bytes_to_path(bytes: &[u8]) -> Option<&Path> {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    Some(Path::new(OsStr::from_bytes(bytes)))
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> Option<&Path> {
    std::str::from_utf8(bytes).ok().map(Path::new)
}

#[derive(Debug, thiserror::Error)]
enum CopyError {
    #[error("read failed: {0}")]
    Read(std::io::Error),
    #[error("{0}")]
    Write(crate::http::response::ResponseError),
}

async fn send_only<W>(out: &mut ResponseWriter<W>, status: StatusCode) -> StatusCode
where
    W: AsyncWrite + Unpin,
{
    if let Err(e) = out.send_status(status).await {
        tracing::warn!(status = status.as_u16(), error = %e, "Failed to send status");
    }
    status
}
