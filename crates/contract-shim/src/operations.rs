//! # Typed Operations
//!
//! One request/response exchange per method, all built on
//! [`Operations::request`]: encode the request payload, send it under the
//! bound `(channel_id, tx_id)`, then decode a RESPONSE or surface an ERROR.

use crate::adapters::correlator::Correlator;
use crate::cert::CertificateStore;
use crate::errors::{ShimError, ShimResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{
    codec, AmountAsset, Asset, ChaincodeInput, ChaincodeSpec, ContractId, ContractStateValue,
    DefineTokenRequest, DelStateRequest, GetContractAllStateRequest, GetStateByPrefixRequest,
    GetStateRequest, GetTimestampRequest, GetTokenBalanceRequest, GlobalProperty, InvokeTokens,
    JuryMsgAddr, KeyRequest, KeyValue, Message, MessageKind, OutChainCallRequest,
    PayOutTokenRequest, PutStateRequest, RecvJuryRequest, Response, SendJuryRequest,
    SupplyTokenRequest, Timestamp,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Typed operations bound to one transaction.
#[derive(Clone)]
pub struct Operations {
    correlator: Correlator,
    channel_id: String,
    tx_id: String,
    contract_id: Vec<u8>,
}

impl Operations {
    /// Bind operations to a transaction context.
    pub fn new(
        correlator: Correlator,
        channel_id: impl Into<String>,
        tx_id: impl Into<String>,
        contract_id: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            correlator,
            channel_id: channel_id.into(),
            tx_id: tx_id.into(),
            contract_id: contract_id.into(),
        }
    }

    /// Contract id requests default to.
    pub fn contract_id(&self) -> &[u8] {
        &self.contract_id
    }

    /// Send a `kind` request and return the RESPONSE payload.
    ///
    /// # Errors
    ///
    /// - `Peer` carrying the ERROR payload text
    /// - `UnexpectedResponse` for any other reply kind
    /// - whatever the correlator returns
    pub async fn request<Req: Serialize + Sync>(
        &self,
        kind: MessageKind,
        what: &'static str,
        req: &Req,
    ) -> ShimResult<Vec<u8>> {
        let payload = codec::encode(what, req)?;
        let msg = Message::new(kind, payload)
            .with_context(self.channel_id.clone(), self.tx_id.clone())
            .with_contract_id(self.contract_id.clone());

        let reply = self.correlator.call(msg).await?;
        match reply.kind {
            MessageKind::Response => Ok(reply.payload),
            MessageKind::Error => {
                let text = String::from_utf8_lossy(&reply.payload).into_owned();
                debug!(kind = %kind, error = %text, "Peer rejected request");
                Err(ShimError::Peer(text))
            }
            received => Err(ShimError::UnexpectedResponse {
                request: kind,
                received,
            }),
        }
    }

    /// [`request`](Self::request), then decode the RESPONSE payload.
    ///
    /// # Errors
    ///
    /// As `request`, plus `Codec` if the payload does not decode.
    pub async fn request_decoded<Req, Resp>(
        &self,
        kind: MessageKind,
        what: &'static str,
        req: &Req,
    ) -> ShimResult<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let payload = self.request(kind, what, req).await?;
        Ok(codec::decode(what, &payload)?)
    }

    // =========================================================================
    // STATE
    // =========================================================================

    /// GET_STATE. Absent keys come back empty.
    pub async fn get_state(&self, collection: &str, contract_id: &[u8], key: &str) -> ShimResult<Vec<u8>> {
        let req = GetStateRequest {
            collection: collection.to_owned(),
            contract_id: contract_id.to_vec(),
            key: key.to_owned(),
        };
        self.request(MessageKind::GetState, "GetState", &req).await
    }

    /// PUT_STATE.
    pub async fn put_state(&self, collection: &str, contract_id: &[u8], key: &str, value: &[u8]) -> ShimResult<()> {
        let req = PutStateRequest {
            collection: collection.to_owned(),
            contract_id: contract_id.to_vec(),
            key: key.to_owned(),
            value: value.to_vec(),
        };
        self.request(MessageKind::PutState, "PutState", &req).await.map(drop)
    }

    /// DEL_STATE.
    pub async fn del_state(&self, collection: &str, contract_id: &[u8], key: &str) -> ShimResult<()> {
        let req = DelStateRequest {
            collection: collection.to_owned(),
            contract_id: contract_id.to_vec(),
            key: key.to_owned(),
        };
        self.request(MessageKind::DelState, "DelState", &req).await.map(drop)
    }

    /// GET_STATE_BY_PREFIX.
    pub async fn get_state_by_prefix(&self, contract_id: &[u8], prefix: &str) -> ShimResult<Vec<KeyValue>> {
        let req = GetStateByPrefixRequest {
            contract_id: contract_id.to_vec(),
            prefix: prefix.to_owned(),
        };
        self.request_decoded(MessageKind::GetStateByPrefix, "GetStateByPrefix", &req)
            .await
    }

    /// GET_CONTRACT_ALL_STATE.
    pub async fn get_contract_all_state(
        &self,
        contract_id: &[u8],
    ) -> ShimResult<BTreeMap<String, ContractStateValue>> {
        let req = GetContractAllStateRequest {
            contract_id: contract_id.to_vec(),
        };
        self.request_decoded(MessageKind::GetContractAllState, "GetContractAllState", &req)
            .await
    }

    /// GET_TIMESTAMP.
    pub async fn get_timestamp(&self, collection: &str, range_number: u32) -> ShimResult<Timestamp> {
        let req = GetTimestampRequest {
            collection: collection.to_owned(),
            range_number,
        };
        self.request_decoded(MessageKind::GetTimestamp, "GetTimestamp", &req).await
    }

    /// GET_SYSTEM_CONFIG_REQUEST.
    pub async fn get_system_config(&self) -> ShimResult<GlobalProperty> {
        self.request_decoded(MessageKind::GetSystemConfigRequest, "GetSystemConfig", &KeyRequest::default())
            .await
    }

    // =========================================================================
    // TOKENS
    // =========================================================================

    /// GET_TOKEN_BALANCE.
    pub async fn get_token_balance(&self, address: &str, asset: Option<&Asset>) -> ShimResult<Vec<InvokeTokens>> {
        let req = GetTokenBalanceRequest {
            address: address.to_owned(),
            asset: asset.cloned(),
        };
        self.request_decoded(MessageKind::GetTokenBalance, "GetTokenBalance", &req)
            .await
    }

    /// PAY_OUT_TOKEN.
    pub async fn pay_out_token(&self, address: &str, amount: &AmountAsset, lock_time: u32) -> ShimResult<()> {
        let req = PayOutTokenRequest {
            asset: amount.asset.clone(),
            amount: amount.amount,
            address: address.to_owned(),
            lock_time,
        };
        self.request(MessageKind::PayOutToken, "PayOutToken", &req).await.map(drop)
    }

    /// DEFINE_TOKEN.
    pub async fn define_token(&self, token_type: u8, define: &[u8], creator: &str) -> ShimResult<()> {
        let req = DefineTokenRequest {
            token_type,
            define: define.to_vec(),
            creator: creator.to_owned(),
        };
        self.request(MessageKind::DefineToken, "DefineToken", &req).await.map(drop)
    }

    /// SUPPLY_TOKEN.
    pub async fn supply_token(&self, asset_id: &[u8], unique_id: &[u8], amount: u64, creator: &str) -> ShimResult<()> {
        let req = SupplyTokenRequest {
            asset_id: asset_id.to_vec(),
            unique_id: unique_id.to_vec(),
            amount,
            creator: creator.to_owned(),
        };
        self.request(MessageKind::SupplyToken, "SupplyToken", &req).await.map(drop)
    }

    // =========================================================================
    // CROSS-CHAIN AND JURY
    // =========================================================================

    /// OUTCHAIN_CALL.
    pub async fn outchain_call(
        &self,
        collection: &str,
        out_chain_name: &str,
        method: &str,
        params: &[u8],
    ) -> ShimResult<Vec<u8>> {
        let req = OutChainCallRequest {
            collection: collection.to_owned(),
            out_chain_name: out_chain_name.to_owned(),
            method: method.to_owned(),
            params: params.to_vec(),
        };
        self.request(MessageKind::OutchainCall, "OutChainCall", &req).await
    }

    /// SEND_JURY.
    pub async fn send_jury(&self, collection: &str, msg_type: u32, consult: &[u8], answer: &[u8]) -> ShimResult<Vec<u8>> {
        let req = SendJuryRequest {
            collection: collection.to_owned(),
            msg_type,
            consult_content: consult.to_vec(),
            my_answer: answer.to_vec(),
        };
        self.request(MessageKind::SendJury, "SendJury", &req).await
    }

    /// RECV_JURY. The peer enforces `timeout`.
    pub async fn recv_jury(
        &self,
        collection: &str,
        msg_type: u32,
        consult: &[u8],
        timeout: u32,
    ) -> ShimResult<Vec<JuryMsgAddr>> {
        let req = RecvJuryRequest {
            collection: collection.to_owned(),
            msg_type,
            consult_content: consult.to_vec(),
            timeout,
        };
        self.request_decoded(MessageKind::RecvJury, "RecvJury", &req).await
    }

    // =========================================================================
    // NESTED INVOCATION
    // =========================================================================

    /// INVOKE_CHAINCODE. Returns the callee's response.
    ///
    /// # Errors
    ///
    /// `Peer` if the peer or the callee reports an error.
    pub async fn invoke_chaincode(&self, name: &str, args: Vec<Vec<u8>>, channel: &str) -> ShimResult<Response> {
        let spec = ChaincodeSpec {
            contract: ContractId { name: name.to_owned() },
            input: ChaincodeInput { args },
            channel: channel.to_owned(),
        };
        let outcome: Message = self
            .request_decoded(MessageKind::InvokeChaincode, "InvokeChaincode", &spec)
            .await?;

        match outcome.kind {
            MessageKind::Completed => Ok(codec::decode("Response", &outcome.payload)?),
            _ => Err(ShimError::Peer(String::from_utf8_lossy(&outcome.payload).into_owned())),
        }
    }

    // =========================================================================
    // CERTIFICATES
    // =========================================================================

    /// GET_CERT_STATE.
    pub async fn get_cert_state(&self, key: &str) -> ShimResult<Vec<u8>> {
        let req = KeyRequest { key: key.to_owned() };
        self.request(MessageKind::GetCertState, "GetCertState", &req).await
    }
}

#[async_trait]
impl CertificateStore for Operations {
    async fn get_cert_state(&self, key: &str) -> Result<Vec<u8>, ShimError> {
        Operations::get_cert_state(self, key).await
    }
}
