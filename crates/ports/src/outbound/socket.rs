//! Socket Port - the persistent WebSocket to the interactive service
//!
//! The port is event-driven: `open` hands the implementation a sender, and
//! everything the socket observes afterwards (open, text frames, errors, the
//! close) is delivered through it. The consumer drains those events on its
//! own tick; implementations never call back into the client.

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

/// Everything a socket can tell the client.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketEvent {
    Opened,
    /// One inbound text frame. Binary frames are discarded by the adapter.
    Message(String),
    Error(String),
    /// The connection ended. `code` is the close status verbatim; `1006` when
    /// the transport broke without a close frame.
    Closed { code: u16, reason: String },
}

pub type SocketEventSender = UnboundedSender<SocketEvent>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SocketError {
    #[error("socket connect failed: {0}")]
    Connect(String),
    #[error("socket is not open")]
    NotOpen,
    #[error("socket send failed: {0}")]
    Send(String),
}

/// WebSocket capability.
#[async_trait]
pub trait SocketPort: Send + Sync {
    /// Open the socket with the given handshake headers. Events flow into
    /// `events` until `Closed` is delivered.
    async fn open(
        &self,
        url: &str,
        headers: &[(String, String)],
        events: SocketEventSender,
    ) -> Result<(), SocketError>;

    /// Send one text frame. Fails with [`SocketError::NotOpen`] when there is
    /// no live connection.
    async fn send(&self, text: String) -> Result<(), SocketError>;

    /// Close with a descriptive reason. No-op when already closed.
    async fn close(&self, reason: &str);

    /// Whether a connection is currently established.
    fn is_open(&self) -> bool;
}
