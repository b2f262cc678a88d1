//! # Ledger-Facing Records
//!
//! Records that contract code reads from or hands to the peer: the
//! invocation `Response`, assets and token amounts, invoke metadata, state
//! rows, chain parameters, jury answers and certificate records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Contract id used for reads and writes of the global state namespace.
pub const GLOBAL_STATE_CONTRACT_ID: [u8; 20] = [0u8; 20];

// =============================================================================
// INVOCATION RESULT
// =============================================================================

/// The value returned by a contract's `init` / `invoke`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// HTTP-style status code.
    pub status: i32,
    /// Human-readable message; required for error statuses.
    pub message: String,
    /// Result bytes for successful calls.
    pub payload: Vec<u8>,
}

impl Response {
    /// Success.
    pub const OK: i32 = 200;
    /// Statuses at or above this are failures.
    pub const ERROR_THRESHOLD: i32 = 400;
    /// Generic failure.
    pub const ERROR: i32 = 500;

    /// A successful response carrying `payload`.
    #[must_use]
    pub fn success(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Self::OK,
            message: String::new(),
            payload: payload.into(),
        }
    }

    /// A failed response carrying `message`.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Self::ERROR,
            message: message.into(),
            payload: Vec::new(),
        }
    }

    /// Returns true if the status marks a failure.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status >= Self::ERROR_THRESHOLD
    }
}

/// Identifies a contract by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractId {
    pub name: String,
}

// =============================================================================
// ASSETS AND TOKENS
// =============================================================================

/// A token type, optionally narrowed to one non-fungible item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub asset_id: String,
    /// Empty for fungible tokens.
    #[serde(default)]
    pub unique_id: String,
}

impl Asset {
    /// A fungible asset.
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            unique_id: String::new(),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unique_id.is_empty() {
            f.write_str(&self.asset_id)
        } else {
            write!(f, "{}-{}", self.asset_id, self.unique_id)
        }
    }
}

/// An amount of one asset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountAsset {
    pub amount: u64,
    pub asset: Asset,
}

/// Tokens attached to an invocation, or one line of a balance listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeTokens {
    pub amount: u64,
    pub asset: Asset,
    /// Receiving address.
    #[serde(default)]
    pub address: String,
}

/// Who invoked the contract and what they paid. Travels as JSON in `args[0]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeInfo {
    pub invoke_address: String,
    #[serde(default)]
    pub invoke_tokens: Vec<InvokeTokens>,
    #[serde(default)]
    pub invoke_fees: Option<AmountAsset>,
}

// =============================================================================
// STATE ROWS
// =============================================================================

/// One row of a prefix scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: Vec<u8>,
}

/// Where a state value was last written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateVersion {
    pub height: u64,
    pub tx_index: u32,
}

/// A state value together with its version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractStateValue {
    pub value: Vec<u8>,
    pub version: Option<StateVersion>,
}

/// A transaction timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamp {
    pub seconds: i64,
    pub nanos: i32,
}

// =============================================================================
// CHAIN PARAMETERS
// =============================================================================

/// Tunable chain parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainParameters {
    pub deposit_amount_for_mediator: u64,
    pub deposit_amount_for_jury: u64,
    pub deposit_amount_for_developer: u64,
    pub deposit_period: u32,
    pub active_mediator_count: u8,
    pub contract_system_version: String,
}

/// Chain-wide properties returned by GET_SYSTEM_CONFIG_REQUEST.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalProperty {
    pub chain_parameters: ChainParameters,
    pub active_mediators: Vec<String>,
    pub active_juries: Vec<String>,
}

// =============================================================================
// JURY AND CERTIFICATES
// =============================================================================

/// One jury member's answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JuryMsgAddr {
    pub address: String,
    pub answer: Vec<u8>,
}

/// A stored certificate and the address holding it. Kept as JSON by the
/// ledger side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertBytesInfo {
    pub holder: String,
    pub raw: Vec<u8>,
}
