//! # Error Types
//!
//! All error types for the contract shim.

use crate::config::ConfigError;
use crate::domain::correlation::CorrelationKey;
use shared_types::{CodecError, MessageKind};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// TRANSPORT ERRORS
// =============================================================================

/// Errors raised by a duplex stream. Any of them is terminal for the
/// connection.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Writing a message failed.
    #[error("send failed: {0}")]
    Send(String),

    /// Reading a message failed.
    #[error("recv failed: {0}")]
    Recv(String),

    /// Closing the write half failed.
    #[error("close send failed: {0}")]
    CloseSend(String),

    /// The other side has gone away.
    #[error("stream closed")]
    Closed,

    /// An inbound frame announced a length above the configured limit.
    #[error("frame too large: {size} > {max} bytes")]
    FrameTooLarge { size: usize, max: usize },

    /// A frame could not be converted to or from a message.
    #[error("bad frame: {0}")]
    Frame(#[from] CodecError),

    /// Socket error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// SHIM ERRORS
// =============================================================================

/// Errors returned by the engine and by every operation call.
#[derive(Debug, Error)]
pub enum ShimError {
    /// The duplex stream failed.
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    /// A request is already outstanding for this transaction.
    #[error("duplicate correlation: a request is already pending for {0}")]
    DuplicateCorrelation(CorrelationKey),

    /// A response arrived for a transaction nobody is waiting on.
    #[error("no pending request for {0}")]
    NoSuchCorrelation(CorrelationKey),

    /// The response router has been torn down.
    #[error("response router closed")]
    RouterClosed,

    /// The waiter for this transaction went away before its response arrived.
    #[error("waiter for {0} dropped its response slot")]
    ResponseDropped(CorrelationKey),

    /// The peer answered with ERROR; the text is the ERROR payload.
    #[error("{0}")]
    Peer(String),

    /// The peer answered with a kind that is neither RESPONSE nor ERROR.
    #[error("unexpected response kind {received} to {request}")]
    UnexpectedResponse {
        request: MessageKind,
        received: MessageKind,
    },

    /// A payload could not be encoded or decoded.
    #[error("codec: {0}")]
    Codec(#[from] CodecError),

    /// An operation call exceeded the configured call timeout.
    #[error("{kind} timed out after {after:?}")]
    Timeout { kind: MessageKind, after: Duration },

    /// A caller-supplied argument was rejected before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The connection closed while the call was waiting.
    #[error("connection closed")]
    ConnectionClosed,

    /// The configuration is unusable.
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

/// Result alias for shim operations.
pub type ShimResult<T> = Result<T, ShimError>;
