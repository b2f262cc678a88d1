//! # Payload Codec
//!
//! Payloads travel inside [`Message`](crate::Message) as opaque bytes. Every
//! payload in this crate is encoded with `bincode`, except the two records the
//! ledger side keeps as JSON (see [`to_json`] / [`from_json`]).

use crate::errors::CodecError;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a payload to its binary form.
pub fn encode<T: Serialize>(what: &'static str, value: &T) -> Result<Vec<u8>, CodecError> {
    bincode::serialize(value).map_err(|e| CodecError::Encode {
        what,
        reason: e.to_string(),
    })
}

/// Decode a payload from its binary form.
pub fn decode<T: DeserializeOwned>(what: &'static str, bytes: &[u8]) -> Result<T, CodecError> {
    bincode::deserialize(bytes).map_err(|e| CodecError::Decode {
        what,
        reason: e.to_string(),
    })
}

/// Encode a JSON record.
pub fn to_json<T: Serialize>(what: &'static str, value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(|e| CodecError::Json {
        what,
        reason: e.to_string(),
    })
}

/// Decode a JSON record.
pub fn from_json<T: DeserializeOwned>(what: &'static str, bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(|e| CodecError::Json {
        what,
        reason: e.to_string(),
    })
}
