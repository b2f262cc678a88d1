//! # Driven Ports (SPI - Outbound)
//!
//! The shim depends on exactly one outside collaborator: a bidirectional
//! stream of discrete messages to the peer.

use crate::errors::TransportError;
use async_trait::async_trait;
use shared_types::Message;

/// A bidirectional, message-oriented connection to the peer.
///
/// ## Implementation Notes
///
/// - `send` may be called from several tasks at once; implementations need
///   not serialize writes themselves, the shim's sender does.
/// - `recv` is only ever called by the engine loop.
/// - Any error from `send` or `recv` ends the connection.
#[async_trait]
pub trait DuplexStream: Send + Sync {
    /// Write one message.
    async fn send(&self, msg: Message) -> Result<(), TransportError>;

    /// Read the next message. `Ok(None)` means the peer closed the stream.
    async fn recv(&self) -> Result<Option<Message>, TransportError>;

    /// Close the write half.
    async fn close_send(&self) -> Result<(), TransportError>;
}
