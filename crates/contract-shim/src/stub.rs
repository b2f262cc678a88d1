//! # Per-Call Stub
//!
//! [`CallContext`] is what user contract code receives for one INIT or
//! TRANSACTION. It lives exactly as long as the call and is bound to that
//! call's `(channel_id, tx_id, contract_id, proposal)`.

use crate::cert::{id_to_decimal, keys, CertRejection, CertificateDecoder, CertificateValidator};
use crate::errors::{ShimError, ShimResult};
use crate::operations::Operations;
use crate::ports::inbound::{ContractStub, InvokeParameters};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{
    codec, AmountAsset, Asset, CertBytesInfo, ContractEvent, ContractStateValue, GlobalProperty,
    InvokeInfo, InvokeTokens, JuryMsgAddr, KeyValue, Proposal, Response, Timestamp,
    GLOBAL_STATE_CONTRACT_ID,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Collection used for ordinary state reads and writes.
const DEFAULT_COLLECTION: &str = "";

/// The stub handed to one contract call.
pub struct CallContext {
    ops: Operations,
    channel_id: String,
    tx_id: String,
    args: Vec<Vec<u8>>,
    proposal: Proposal,
    event: Mutex<Option<ContractEvent>>,
    decoder: Arc<dyn CertificateDecoder>,
}

impl CallContext {
    /// Build the stub for one call.
    pub fn new(
        ops: Operations,
        channel_id: impl Into<String>,
        tx_id: impl Into<String>,
        args: Vec<Vec<u8>>,
        proposal: Proposal,
        decoder: Arc<dyn CertificateDecoder>,
    ) -> Self {
        Self {
            ops,
            channel_id: channel_id.into(),
            tx_id: tx_id.into(),
            args,
            proposal,
            event: Mutex::new(None),
            decoder,
        }
    }

    /// Remove and return the event set by the contract, if any.
    pub fn take_event(&self) -> Option<ContractEvent> {
        self.event.lock().take()
    }

    fn invoke_info(&self) -> ShimResult<InvokeInfo> {
        let raw = self
            .args
            .first()
            .ok_or_else(|| ShimError::InvalidArgument("missing invoke info argument".into()))?;
        Ok(codec::from_json("InvokeInfo", raw)?)
    }

    fn require_key(key: &str) -> ShimResult<()> {
        if key.is_empty() {
            return Err(ShimError::InvalidArgument("key must not be empty".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ContractStub for CallContext {
    fn args(&self) -> &[Vec<u8>] {
        &self.args
    }

    fn string_args(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect()
    }

    fn function_and_parameters(&self) -> (String, Vec<String>) {
        let mut strings = self.string_args().into_iter().skip(1);
        let function = strings.next().unwrap_or_default();
        (function, strings.collect())
    }

    fn args_slice(&self) -> Vec<u8> {
        self.args.concat()
    }

    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn channel_id(&self) -> &str {
        &self.channel_id
    }

    fn contract_id(&self) -> &[u8] {
        self.ops.contract_id()
    }

    fn contract_id_hex(&self) -> String {
        hex::encode(self.ops.contract_id())
    }

    fn invoke_address(&self) -> ShimResult<String> {
        Ok(self.invoke_info()?.invoke_address)
    }

    fn invoke_tokens(&self) -> ShimResult<Vec<InvokeTokens>> {
        Ok(self.invoke_info()?.invoke_tokens)
    }

    fn invoke_fees(&self) -> ShimResult<Option<AmountAsset>> {
        Ok(self.invoke_info()?.invoke_fees)
    }

    fn invoke_parameters(&self) -> ShimResult<InvokeParameters> {
        let info = self.invoke_info()?;
        let (function, params) = self.function_and_parameters();
        Ok(InvokeParameters { info, function, params })
    }

    async fn get_state(&self, key: &str) -> ShimResult<Vec<u8>> {
        self.ops
            .get_state(DEFAULT_COLLECTION, self.ops.contract_id(), key)
            .await
    }

    async fn put_state(&self, key: &str, value: &[u8]) -> ShimResult<()> {
        Self::require_key(key)?;
        self.ops
            .put_state(DEFAULT_COLLECTION, self.ops.contract_id(), key, value)
            .await
    }

    async fn del_state(&self, key: &str) -> ShimResult<()> {
        Self::require_key(key)?;
        self.ops
            .del_state(DEFAULT_COLLECTION, self.ops.contract_id(), key)
            .await
    }

    async fn get_global_state(&self, key: &str) -> ShimResult<Vec<u8>> {
        self.ops
            .get_state(DEFAULT_COLLECTION, &GLOBAL_STATE_CONTRACT_ID, key)
            .await
    }

    async fn put_global_state(&self, key: &str, value: &[u8]) -> ShimResult<()> {
        Self::require_key(key)?;
        self.ops
            .put_state(DEFAULT_COLLECTION, &GLOBAL_STATE_CONTRACT_ID, key, value)
            .await
    }

    async fn del_global_state(&self, key: &str) -> ShimResult<()> {
        Self::require_key(key)?;
        self.ops
            .del_state(DEFAULT_COLLECTION, &GLOBAL_STATE_CONTRACT_ID, key)
            .await
    }

    async fn get_contract_state(&self, contract_id: &[u8], key: &str) -> ShimResult<Vec<u8>> {
        self.ops.get_state(DEFAULT_COLLECTION, contract_id, key).await
    }

    async fn get_state_by_prefix(&self, prefix: &str) -> ShimResult<Vec<KeyValue>> {
        self.ops
            .get_state_by_prefix(self.ops.contract_id(), prefix)
            .await
    }

    async fn get_contract_all_state(&self) -> ShimResult<BTreeMap<String, ContractStateValue>> {
        self.ops.get_contract_all_state(self.ops.contract_id()).await
    }

    async fn get_tx_timestamp(&self, range_number: u32) -> ShimResult<Timestamp> {
        self.ops.get_timestamp(DEFAULT_COLLECTION, range_number).await
    }

    fn set_event(&self, name: &str, payload: &[u8]) -> ShimResult<()> {
        if name.is_empty() {
            return Err(ShimError::InvalidArgument("event name must not be empty".into()));
        }
        *self.event.lock() = Some(ContractEvent {
            name: name.to_owned(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn get_system_config(&self) -> ShimResult<GlobalProperty> {
        self.ops.get_system_config().await
    }

    async fn get_token_balance(&self, address: &str, asset: Option<&Asset>) -> ShimResult<Vec<InvokeTokens>> {
        self.ops.get_token_balance(address, asset).await
    }

    async fn pay_out_token(&self, address: &str, amount: &AmountAsset, lock_time: u32) -> ShimResult<()> {
        self.ops.pay_out_token(address, amount, lock_time).await
    }

    async fn define_token(&self, token_type: u8, define: &[u8], creator: &str) -> ShimResult<()> {
        self.ops.define_token(token_type, define, creator).await
    }

    async fn supply_token(&self, asset_id: &[u8], unique_id: &[u8], amount: u64, creator: &str) -> ShimResult<()> {
        self.ops.supply_token(asset_id, unique_id, amount, creator).await
    }

    async fn outchain_call(&self, out_chain_name: &str, method: &str, params: &[u8]) -> ShimResult<Vec<u8>> {
        self.ops
            .outchain_call(DEFAULT_COLLECTION, out_chain_name, method, params)
            .await
    }

    async fn send_jury(&self, msg_type: u32, consult: &[u8], answer: &[u8]) -> ShimResult<Vec<u8>> {
        self.ops
            .send_jury(DEFAULT_COLLECTION, msg_type, consult, answer)
            .await
    }

    async fn recv_jury(&self, msg_type: u32, consult: &[u8], timeout: u32) -> ShimResult<Vec<JuryMsgAddr>> {
        self.ops
            .recv_jury(DEFAULT_COLLECTION, msg_type, consult, timeout)
            .await
    }

    async fn invoke_chaincode(&self, name: &str, args: Vec<Vec<u8>>, channel: &str) -> Response {
        self.ops
            .invoke_chaincode(name, args, channel)
            .await
            .unwrap_or_else(|e| Response::error(e.to_string()))
    }

    async fn get_requester_cert(&self) -> ShimResult<Vec<u8>> {
        if self.proposal.cert_id.is_empty() {
            return Err(ShimError::InvalidArgument("requester presented no certificate".into()));
        }
        let id = id_to_decimal(&self.proposal.cert_id)
            .ok_or_else(|| ShimError::InvalidArgument("certificate id too long".into()))?;

        let raw = self.ops.get_cert_state(&keys::cert_bytes(&id)).await?;
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        let record: CertBytesInfo = codec::from_json("CertBytesInfo", &raw)?;
        Ok(record.raw)
    }

    async fn is_requester_cert_valid(&self) -> Result<(), CertRejection> {
        let caller = self.invoke_address()?;
        CertificateValidator::new(&self.ops, self.decoder.as_ref())
            .validate(&caller, &self.proposal.cert_id, chrono::Utc::now().timestamp())
            .await
    }
}
