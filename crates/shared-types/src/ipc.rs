//! # Stream Message Kinds and Operation Payloads
//!
//! ## Kind Roles
//!
//! | Role | Kinds |
//! |------|-------|
//! | Lifecycle | `REGISTER`, `REGISTERED`, `READY`, `INIT`, `TRANSACTION`, `COMPLETED`, `ERROR`, `RESPONSE`, `KEEPALIVE` |
//! | Operations (contract → peer) | `GET_STATE` … `GET_CERT_STATE` |
//!
//! Each operation kind has a request payload below. The success reply is a
//! `RESPONSE` whose payload shape is documented on the request type; a
//! failure reply is an `ERROR` whose payload is human-readable text.

use crate::entities::{Asset, ContractId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of message kinds on the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    // =========================================================================
    // LIFECYCLE
    // =========================================================================
    /// Contract → peer: announce the contract on a fresh stream.
    Register,
    /// Peer → contract: registration accepted.
    Registered,
    /// Peer → contract: ready for invocations.
    Ready,
    /// Peer → contract: run the contract's `init`.
    Init,
    /// Peer → contract: run the contract's `invoke`.
    Transaction,
    /// Contract → peer: an init/transaction finished; payload is a `Response`.
    Completed,
    /// Either direction: failure; payload is human-readable text.
    Error,
    /// Peer → contract: successful reply to an operation.
    Response,
    /// Liveness probe; carries nothing and changes nothing.
    Keepalive,

    // =========================================================================
    // OPERATIONS
    // =========================================================================
    /// Read one key.
    GetState,
    /// Write one key.
    PutState,
    /// Delete one key.
    DelState,
    /// Scan keys by prefix.
    GetStateByPrefix,
    /// Read the transaction timestamp.
    GetTimestamp,
    /// Read token balances of an address.
    GetTokenBalance,
    /// Pay tokens locked in the contract out to an address.
    PayOutToken,
    /// Define a new token.
    DefineToken,
    /// Supply more of an existing token.
    SupplyToken,
    /// Call out to another chain.
    OutchainCall,
    /// Broadcast this node's answer to the jury.
    SendJury,
    /// Collect the jury's answers.
    RecvJury,
    /// Read chain parameters.
    GetSystemConfigRequest,
    /// Dump a contract's whole state.
    GetContractAllState,
    /// Invoke another contract.
    InvokeChaincode,
    /// Read certificate-store data.
    GetCertState,
}

impl MessageKind {
    /// The wire-level name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "REGISTER",
            Self::Registered => "REGISTERED",
            Self::Ready => "READY",
            Self::Init => "INIT",
            Self::Transaction => "TRANSACTION",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
            Self::Response => "RESPONSE",
            Self::Keepalive => "KEEPALIVE",
            Self::GetState => "GET_STATE",
            Self::PutState => "PUT_STATE",
            Self::DelState => "DEL_STATE",
            Self::GetStateByPrefix => "GET_STATE_BY_PREFIX",
            Self::GetTimestamp => "GET_TIMESTAMP",
            Self::GetTokenBalance => "GET_TOKEN_BALANCE",
            Self::PayOutToken => "PAY_OUT_TOKEN",
            Self::DefineToken => "DEFINE_TOKEN",
            Self::SupplyToken => "SUPPLY_TOKEN",
            Self::OutchainCall => "OUTCHAIN_CALL",
            Self::SendJury => "SEND_JURY",
            Self::RecvJury => "RECV_JURY",
            Self::GetSystemConfigRequest => "GET_SYSTEM_CONFIG_REQUEST",
            Self::GetContractAllState => "GET_CONTRACT_ALL_STATE",
            Self::InvokeChaincode => "INVOKE_CHAINCODE",
            Self::GetCertState => "GET_CERT_STATE",
        }
    }

    /// Returns true for kinds a contract issues toward the peer as requests.
    #[must_use]
    pub fn is_operation(&self) -> bool {
        !matches!(
            self,
            Self::Register
                | Self::Registered
                | Self::Ready
                | Self::Init
                | Self::Transaction
                | Self::Completed
                | Self::Error
                | Self::Response
                | Self::Keepalive
        )
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// LIFECYCLE PAYLOADS
// =============================================================================

/// Payload of INIT/TRANSACTION: the invocation arguments.
///
/// By convention `args[0]` is the JSON `InvokeInfo`, `args[1]` the function
/// name and the rest are function parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeInput {
    /// Raw arguments.
    pub args: Vec<Vec<u8>>,
}

// =============================================================================
// STATE
// =============================================================================

/// GET_STATE request. Success payload: raw value bytes (empty if absent).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetStateRequest {
    pub collection: String,
    pub contract_id: Vec<u8>,
    pub key: String,
}

/// PUT_STATE request. Success payload: empty ack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutStateRequest {
    pub collection: String,
    pub contract_id: Vec<u8>,
    pub key: String,
    pub value: Vec<u8>,
}

/// DEL_STATE request. Success payload: empty ack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelStateRequest {
    pub collection: String,
    pub contract_id: Vec<u8>,
    pub key: String,
}

/// GET_STATE_BY_PREFIX request. Success payload: `Vec<KeyValue>` in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetStateByPrefixRequest {
    pub contract_id: Vec<u8>,
    pub prefix: String,
}

/// GET_TIMESTAMP request. Success payload: `Timestamp`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTimestampRequest {
    pub collection: String,
    pub range_number: u32,
}

/// GET_CONTRACT_ALL_STATE request. Success payload:
/// `BTreeMap<String, ContractStateValue>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetContractAllStateRequest {
    pub contract_id: Vec<u8>,
}

// =============================================================================
// TOKENS
// =============================================================================

/// GET_TOKEN_BALANCE request. Success payload: `Vec<InvokeTokens>`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTokenBalanceRequest {
    pub address: String,
    /// Restrict to one asset; `None` lists every asset.
    pub asset: Option<Asset>,
}

/// PAY_OUT_TOKEN request. Success payload: empty ack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayOutTokenRequest {
    pub asset: Asset,
    pub amount: u64,
    pub address: String,
    pub lock_time: u32,
}

/// DEFINE_TOKEN request. Success payload: empty ack.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefineTokenRequest {
    pub token_type: u8,
    pub define: Vec<u8>,
    pub creator: String,
}

/// SUPPLY_TOKEN request. Success payload: empty ack.
///
/// `unique_id` is empty for fungible supply and names the item for
/// non-fungible supply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyTokenRequest {
    pub asset_id: Vec<u8>,
    pub unique_id: Vec<u8>,
    pub amount: u64,
    pub creator: String,
}

// =============================================================================
// CROSS-CHAIN AND JURY
// =============================================================================

/// OUTCHAIN_CALL request. Success payload: raw result bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutChainCallRequest {
    pub collection: String,
    pub out_chain_name: String,
    pub method: String,
    pub params: Vec<u8>,
}

/// SEND_JURY request. Success payload: raw ack bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendJuryRequest {
    pub collection: String,
    pub msg_type: u32,
    pub consult_content: Vec<u8>,
    pub my_answer: Vec<u8>,
}

/// RECV_JURY request. Success payload: `Vec<JuryMsgAddr>`.
///
/// `timeout` is enforced by the peer, not by the contract side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecvJuryRequest {
    pub collection: String,
    pub msg_type: u32,
    pub consult_content: Vec<u8>,
    pub timeout: u32,
}

// =============================================================================
// CONFIG, NESTED INVOCATION, CERTIFICATES
// =============================================================================

/// GET_SYSTEM_CONFIG_REQUEST / GET_CERT_STATE request: a single lookup key.
/// Empty for the system config. Success payloads: `GlobalProperty`
/// (system config) or raw bytes (certificate state).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRequest {
    pub key: String,
}

/// INVOKE_CHAINCODE request.
///
/// Success payload: the callee's final `Message` (COMPLETED carrying a
/// `Response`, or ERROR), encoded as bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChaincodeSpec {
    pub contract: ContractId,
    pub input: ChaincodeInput,
    /// Target channel; empty means the caller's channel.
    pub channel: String,
}
