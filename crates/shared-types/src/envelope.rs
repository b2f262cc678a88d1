//! # `Message` Envelope
//!
//! The universal wrapper for everything exchanged between a contract process
//! and its host peer.
//!
//! ## Properties
//!
//! - **Kind-Tagged**: `kind` alone determines how `payload` is decoded.
//! - **Context-Addressed**: `(channel_id, tx_id)` identifies the logical
//!   transaction a message belongs to. Replies carry the same pair as the
//!   request they answer.
//! - **Immutable Once Sent**: builders consume `self`; nothing mutates a
//!   message after it has been handed to the sender.

use crate::ipc::MessageKind;
use serde::{Deserialize, Serialize};

/// An event a contract attaches to its completion message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractEvent {
    /// Event name chosen by the contract.
    pub name: String,
    /// Opaque event data.
    pub payload: Vec<u8>,
}

/// Transaction-proposal data forwarded by the peer with INIT/TRANSACTION.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Certificate id presented by the requester (big-endian integer bytes).
    /// Empty when the requester presented no certificate.
    pub cert_id: Vec<u8>,
    /// Raw signed proposal bytes, passed through untouched.
    pub signed_bytes: Vec<u8>,
}

/// The envelope for every frame on the duplex stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// What this message is; selects the payload shape.
    pub kind: MessageKind,
    /// Kind-specific payload bytes.
    pub payload: Vec<u8>,
    /// Transaction id.
    pub tx_id: String,
    /// Channel the transaction runs on.
    pub channel_id: String,
    /// Contract the message concerns (empty when not applicable).
    pub contract_id: Vec<u8>,
    /// Event attached by the contract, if any.
    pub event: Option<ContractEvent>,
    /// Proposal data, present on INIT/TRANSACTION.
    pub proposal: Option<Proposal>,
}

impl Message {
    /// Create a message with no transaction context.
    #[must_use]
    pub fn new(kind: MessageKind, payload: Vec<u8>) -> Self {
        Self {
            kind,
            payload,
            tx_id: String::new(),
            channel_id: String::new(),
            contract_id: Vec::new(),
            event: None,
            proposal: None,
        }
    }

    /// Bind the message to a `(channel_id, tx_id)` context.
    #[must_use]
    pub fn with_context(mut self, channel_id: impl Into<String>, tx_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self.tx_id = tx_id.into();
        self
    }

    /// Set the contract id.
    #[must_use]
    pub fn with_contract_id(mut self, contract_id: impl Into<Vec<u8>>) -> Self {
        self.contract_id = contract_id.into();
        self
    }

    /// Attach a contract event.
    #[must_use]
    pub fn with_event(mut self, event: Option<ContractEvent>) -> Self {
        self.event = event;
        self
    }

    /// Attach proposal data.
    #[must_use]
    pub fn with_proposal(mut self, proposal: Proposal) -> Self {
        self.proposal = Some(proposal);
        self
    }

    /// Build a reply of `kind` sharing this message's context.
    #[must_use]
    pub fn reply(&self, kind: MessageKind, payload: Vec<u8>) -> Self {
        Self::new(kind, payload)
            .with_context(self.channel_id.clone(), self.tx_id.clone())
            .with_contract_id(self.contract_id.clone())
    }

    /// The first eight characters of the transaction id, for logs.
    #[must_use]
    pub fn short_tx_id(&self) -> &str {
        short_tx_id(&self.tx_id)
    }
}

/// Shorten a transaction id to at most eight characters for logging.
#[must_use]
pub fn short_tx_id(tx_id: &str) -> &str {
    match tx_id.char_indices().nth(8) {
        Some((idx, _)) => &tx_id[..idx],
        None => tx_id,
    }
}
