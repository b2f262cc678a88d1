//! # Shared Types Crate
//!
//! This crate contains the `Message` envelope, the `MessageKind` enumeration,
//! every operation payload, and the ledger-facing records exchanged between a
//! contract process and its host peer.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Both sides of the stream (the contract shim
//!   and any peer implementation or test double) use these definitions.
//! - **Opaque Payloads**: The envelope carries `payload` as bytes; its shape is
//!   determined solely by `kind` and decoded with [`codec`].
//! - **Correlation by Context**: Requests and responses are matched on the
//!   envelope's `(channel_id, tx_id)` pair, never on payload contents.

pub mod codec;
pub mod entities;
pub mod envelope;
pub mod errors;
pub mod ipc;

pub use entities::*;
pub use envelope::{short_tx_id, ContractEvent, Message, Proposal};
pub use errors::CodecError;
pub use ipc::*;
