//! The shared, persistent connection to the lookup backend.
//!
//! # Wire protocol
//! ```text
//! → <key>\n
//! ← <row>\n        (zero or more)
//! ← \n             (result sentinel)
//! ```
//!
//! The protocol carries no request identifiers, so replies are matched to
//! inquiries by order alone. A [`LookupSession`] holds the channel lock from
//! the moment the key is written until the sentinel is read.
//!
//! Keys and rows are raw bytes; neither side is assumed to be UTF-8.

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, MutexGuard};

use crate::backend::BackendError;

/// Default bound on a single reply row.
pub const DEFAULT_MAX_ROW_BYTES: usize = 8192;

/// Both halves of the backend stream plus framing state.
#[derive(Debug)]
struct Channel {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    /// An inquiry was written and its sentinel has not been read yet.
    pending: bool,
    /// A read or write failed; the stream can no longer be trusted.
    broken: bool,
    /// Longest row kept; the rest of a longer row is discarded.
    max_row_bytes: usize,
}

impl Channel {
    /// Read one raw line. `Ok(None)` means the backend closed the stream.
    ///
    /// A row longer than `max_row_bytes` is cut at the bound and still ends
    /// in `\n`, so the framing stays intact.
    async fn read_line(&mut self) -> Result<Option<Vec<u8>>, BackendError> {
        let mut line = Vec::new();
        let n = self.read_bounded(&mut line).await?;
        if line.ends_with(b"\n") {
            return Ok(Some(line));
        }
        if n < self.max_row_bytes {
            // Nothing, or a partial record, before end of stream.
            self.broken = true;
            return Ok(None);
        }

        let mut discarded = 0;
        loop {
            let mut rest = Vec::new();
            let n = self.read_bounded(&mut rest).await?;
            if n == 0 || (n < self.max_row_bytes && !rest.ends_with(b"\n")) {
                self.broken = true;
                return Ok(None);
            }
            discarded += n;
            if rest.ends_with(b"\n") {
                break;
            }
        }
        tracing::warn!(kept = line.len(), discarded, "Backend row exceeds limit, truncated");
        line.push(b'\n');
        Ok(Some(line))
    }

    /// Append at most `max_row_bytes`, stopping after a `\n`.
    async fn read_bounded(&mut self, buf: &mut Vec<u8>) -> Result<usize, BackendError> {
        let limit = self.max_row_bytes as u64;
        match (&mut self.reader).take(limit).read_until(b'\n', buf).await {
            Ok(n) => Ok(n),
            Err(e) => {
                self.broken = true;
                Err(BackendError::Io(e))
            }
        }
    }

    /// Discard the rest of an abandoned reply.
    async fn drain(&mut self) -> Result<usize, BackendError> {
        let mut discarded = 0;
        while self.pending {
            match self.read_line().await? {
                None => return Err(BackendError::Closed),
                Some(line) if line == b"\n" => self.pending = false,
                Some(_) => discarded += 1,
            }
        }
        Ok(discarded)
    }
}

/// Single-flight handle to the lookup backend, shared by every connection.
#[derive(Debug)]
pub struct BackendConnection {
    channel: Mutex<Channel>,
    peer: String,
}

impl BackendConnection {
    /// Resolve `host` and connect. Called once at startup.
    pub async fn connect(host: &str, port: u16) -> Result<Self, BackendError> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|source| BackendError::Connect {
                address: format!("{}:{}", host, port),
                source,
            })?;

        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| format!("{}:{}", host, port));

        tracing::info!(backend = %peer, "Connected to lookup backend");
        Ok(Self::from_stream(stream, peer))
    }

    /// Wrap an already connected stream.
    pub fn from_stream(stream: TcpStream, peer: impl Into<String>) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            channel: Mutex::new(Channel {
                reader: BufReader::new(read_half),
                writer: write_half,
                pending: false,
                broken: false,
                max_row_bytes: DEFAULT_MAX_ROW_BYTES,
            }),
            peer: peer.into(),
        }
    }

    /// Bound each reply row to `max_row_bytes` (at least 1).
    pub fn with_max_row_bytes(mut self, max_row_bytes: usize) -> Self {
        self.channel.get_mut().max_row_bytes = max_row_bytes.max(1);
        self
    }

    /// Address of the backend, for logging.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Whether a previous failure has made the channel unusable.
    #[cfg(test)]
    async fn is_broken(&self) -> bool {
        self.channel.lock().await.broken
    }

    /// Send `key` and return a session yielding the reply rows.
    ///
    /// Waits for any other session to finish first. A reply left unread by an
    /// earlier session is drained before the new key is written.
    pub async fn lookup(&self, key: &[u8]) -> Result<LookupSession<'_>, BackendError> {
        let mut channel = self.channel.lock().await;
        if channel.broken {
            return Err(BackendError::Unavailable);
        }

        if channel.pending {
            let discarded = channel.drain().await?;
            tracing::debug!(backend = %self.peer, discarded, "Drained abandoned lookup reply");
        }

        let mut request = Vec::with_capacity(key.len() + 1);
        request.extend_from_slice(key);
        request.push(b'\n');

        let written = match channel.writer.write_all(&request).await {
            Ok(()) => channel.writer.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            channel.broken = true;
            return Err(BackendError::Io(e));
        }
        channel.pending = true;

        Ok(LookupSession { channel })
    }
}

/// Exclusive access to the backend for one inquiry.
///
/// Dropping a session before the sentinel leaves the reply pending; the next
/// [`BackendConnection::lookup`] drains it.
pub struct LookupSession<'a> {
    channel: MutexGuard<'a, Channel>,
}

impl LookupSession<'_> {
    /// Next result row, including its `\n`, or `None` at the sentinel.
    pub async fn next_row(&mut self) -> Result<Option<Vec<u8>>, BackendError> {
        if !self.channel.pending {
            return Ok(None);
        }
        match self.channel.read_line().await? {
            None => Err(BackendError::Closed),
            Some(line) if line == b"\n" => {
                self.channel.pending = false;
                Ok(None)
            }
            Some(line) => Ok(Some(line)),
        }
    }

    /// True once the sentinel has been read.
    #[cfg(test)]
    fn is_complete(&self) -> bool {
        !self.channel.pending
    }
}
