//! # Error Types
//!
//! Errors raised while encoding or decoding payloads.

use thiserror::Error;

/// Errors that can occur while converting payloads to and from bytes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Binary (bincode) encoding failed.
    #[error("encode {what}: {reason}")]
    Encode { what: &'static str, reason: String },

    /// Binary (bincode) decoding failed.
    #[error("decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    /// JSON encoding or decoding failed.
    #[error("json {what}: {reason}")]
    Json { what: &'static str, reason: String },
}
