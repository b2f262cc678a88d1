//! # Driving Ports (API - Inbound)
//!
//! [`Contract`] is the surface user contract code implements. The engine
//! calls it once per INIT or TRANSACTION, handing it a [`ContractStub`]
//! scoped to that one call.

use crate::cert::CertRejection;
use crate::errors::ShimResult;
use async_trait::async_trait;
use shared_types::{
    AmountAsset, Asset, ContractStateValue, GlobalProperty, InvokeInfo, InvokeTokens, JuryMsgAddr,
    KeyValue, Response, Timestamp,
};
use std::collections::BTreeMap;

// =============================================================================
// CONTRACT
// =============================================================================

/// User contract code hosted by the shim.
#[async_trait]
pub trait Contract: Send + Sync + 'static {
    /// Called for INIT (deployment or upgrade).
    async fn init(&self, stub: &dyn ContractStub) -> Response;

    /// Called for every TRANSACTION.
    async fn invoke(&self, stub: &dyn ContractStub) -> Response;
}

/// The decoded invocation arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeParameters {
    /// The invoke info carried in `args[0]`.
    pub info: InvokeInfo,
    /// Function name (`args[1]`).
    pub function: String,
    /// Remaining arguments as strings.
    pub params: Vec<String>,
}

// =============================================================================
// CONTRACT STUB
// =============================================================================

/// Everything a contract may do during one call.
///
/// Argument accessors are local. Every other method is one request/response
/// exchange with the peer on the call's `(channel_id, tx_id)`.
#[async_trait]
pub trait ContractStub: Send + Sync {
    // -------------------------------------------------------------------------
    // Arguments and context
    // -------------------------------------------------------------------------

    /// Raw arguments.
    fn args(&self) -> &[Vec<u8>];

    /// Arguments as lossy UTF-8 strings.
    fn string_args(&self) -> Vec<String>;

    /// `args[1]` and `args[2..]` as strings; `args[0]` is the invoke info.
    fn function_and_parameters(&self) -> (String, Vec<String>);

    /// All arguments concatenated.
    fn args_slice(&self) -> Vec<u8>;

    /// Transaction id of this call.
    fn tx_id(&self) -> &str;

    /// Channel of this call.
    fn channel_id(&self) -> &str;

    /// Contract id of this call.
    fn contract_id(&self) -> &[u8];

    /// Contract id as lowercase hex.
    fn contract_id_hex(&self) -> String;

    // -------------------------------------------------------------------------
    // Invoke info
    // -------------------------------------------------------------------------

    /// Address that sent the transaction.
    fn invoke_address(&self) -> ShimResult<String>;

    /// Tokens paid into the contract with the transaction.
    fn invoke_tokens(&self) -> ShimResult<Vec<InvokeTokens>>;

    /// Fees paid with the transaction.
    fn invoke_fees(&self) -> ShimResult<Option<AmountAsset>>;

    /// Invoke info, function name and parameters in one go.
    fn invoke_parameters(&self) -> ShimResult<InvokeParameters>;

    // -------------------------------------------------------------------------
    // State
    // -------------------------------------------------------------------------

    /// Read a key of this contract. Absent keys read as empty.
    async fn get_state(&self, key: &str) -> ShimResult<Vec<u8>>;

    /// Write a key of this contract.
    async fn put_state(&self, key: &str, value: &[u8]) -> ShimResult<()>;

    /// Delete a key of this contract.
    async fn del_state(&self, key: &str) -> ShimResult<()>;

    /// Read a key of the global state.
    async fn get_global_state(&self, key: &str) -> ShimResult<Vec<u8>>;

    /// Write a key of the global state.
    async fn put_global_state(&self, key: &str, value: &[u8]) -> ShimResult<()>;

    /// Delete a key of the global state.
    async fn del_global_state(&self, key: &str) -> ShimResult<()>;

    /// Read a key of another contract.
    async fn get_contract_state(&self, contract_id: &[u8], key: &str) -> ShimResult<Vec<u8>>;

    /// Scan this contract's keys by prefix, in key order.
    async fn get_state_by_prefix(&self, prefix: &str) -> ShimResult<Vec<KeyValue>>;

    /// Dump this contract's whole state.
    async fn get_contract_all_state(&self) -> ShimResult<BTreeMap<String, ContractStateValue>>;

    /// Transaction timestamp.
    async fn get_tx_timestamp(&self, range_number: u32) -> ShimResult<Timestamp>;

    /// Attach an event to this call's outcome. A later call replaces it.
    fn set_event(&self, name: &str, payload: &[u8]) -> ShimResult<()>;

    /// Chain parameters.
    async fn get_system_config(&self) -> ShimResult<GlobalProperty>;

    // -------------------------------------------------------------------------
    // Tokens
    // -------------------------------------------------------------------------

    /// Balances of `address`, optionally restricted to one asset.
    async fn get_token_balance(
        &self,
        address: &str,
        asset: Option<&Asset>,
    ) -> ShimResult<Vec<InvokeTokens>>;

    /// Pay tokens held by the contract out to `address`.
    async fn pay_out_token(&self, address: &str, amount: &AmountAsset, lock_time: u32) -> ShimResult<()>;

    /// Define a new token.
    async fn define_token(&self, token_type: u8, define: &[u8], creator: &str) -> ShimResult<()>;

    /// Supply more of an existing token.
    async fn supply_token(
        &self,
        asset_id: &[u8],
        unique_id: &[u8],
        amount: u64,
        creator: &str,
    ) -> ShimResult<()>;

    // -------------------------------------------------------------------------
    // Cross-chain, jury, nested calls
    // -------------------------------------------------------------------------

    /// Call a method on another chain.
    async fn outchain_call(&self, out_chain_name: &str, method: &str, params: &[u8]) -> ShimResult<Vec<u8>>;

    /// Broadcast this node's answer to the jury.
    async fn send_jury(&self, msg_type: u32, consult: &[u8], answer: &[u8]) -> ShimResult<Vec<u8>>;

    /// Collect the jury's answers. `timeout` is enforced by the peer.
    async fn recv_jury(&self, msg_type: u32, consult: &[u8], timeout: u32) -> ShimResult<Vec<JuryMsgAddr>>;

    /// Invoke another contract. Failures come back as an error-status
    /// response rather than an `Err`.
    async fn invoke_chaincode(&self, name: &str, args: Vec<Vec<u8>>, channel: &str) -> Response;

    // -------------------------------------------------------------------------
    // Certificates
    // -------------------------------------------------------------------------

    /// Raw bytes of the certificate the requester presented.
    async fn get_requester_cert(&self) -> ShimResult<Vec<u8>>;

    /// Check the requester's certificate against the certificate store.
    async fn is_requester_cert_valid(&self) -> Result<(), CertRejection>;
}
