//! Connection state machine and lifecycle tracking.
//!
//! # Responsibilities
//! - Track connection state (Accepted → HeaderRead → Routed → Closed)
//! - Generate unique connection IDs for tracing
//! - Count live connections so shutdown can wait for them

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Where a connection is in its single request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket accepted, nothing read yet.
    Accepted,
    /// Request line and headers consumed.
    HeaderRead,
    /// Handed to a handler.
    Routed,
    /// Parsing failed; a rejection status is being sent.
    Rejected,
    /// Handles released.
    Closed,
}

impl ConnectionState {
    /// Whether moving from `self` to `next` is a legal step.
    pub fn can_advance_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Accepted, HeaderRead)
                | (Accepted, Rejected)
                | (HeaderRead, Routed)
                | (Accepted | HeaderRead | Routed | Rejected, Closed)
        )
    }
}

/// Tracks active connections for graceful shutdown.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    /// Current count of active connections.
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    /// Create a new connection tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new active connection. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        let id = ConnectionId::new();
        tracing::trace!(connection_id = %id, "Connection opened");
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
            id,
            state: ConnectionState::Accepted,
        }
    }

    /// Get current active connection count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Wait until every tracked connection has closed.
    pub async fn wait_idle(&self) {
        while self.active_count() > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

/// Guard that tracks a connection's lifetime and state.
/// Decrements active count when dropped.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
    id: ConnectionId,
    state: ConnectionState,
}

impl ConnectionGuard {
    /// Get this connection's ID.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Move to `next`. Illegal steps are logged and ignored.
    pub fn advance(&mut self, next: ConnectionState) {
        if self.state.can_advance_to(next) {
            tracing::trace!(connection_id = %self.id, from = ?self.state, to = ?next, "Connection state");
            self.state = next;
        } else {
            tracing::warn!(connection_id = %self.id, from = ?self.state, to = ?next, "Illegal connection state change");
        }
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.advance(ConnectionState::Closed);
        self.active_count.fetch_sub(1, Ordering::SeqCst);
    }
}
