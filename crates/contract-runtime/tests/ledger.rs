//! The bundled ledger against an in-memory peer that keeps real state.

use contract_runtime::asset_ledger::{balance_key, OWNER_KEY};
use contract_runtime::AssetLedger;
use contract_shim::prelude::*;
use shared_types::{
    codec, ChaincodeInput, DelStateRequest, GetStateRequest, PayOutTokenRequest, PutStateRequest,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

/// A peer holding contract state in a map and recording payouts.
struct LedgerPeer {
    stream: MemoryStream,
    state: HashMap<String, Vec<u8>>,
    payouts: Vec<PayOutTokenRequest>,
    next_tx: u32,
}

impl LedgerPeer {
    async fn start() -> Self {
        let (local, remote) = MemoryStream::pair();
        let config = ShimConfig {
            contract_name: "asset-ledger".into(),
            ..ShimConfig::default()
        };
        let (engine, _handle) = Engine::new(Arc::new(local), Arc::new(AssetLedger), &config);
        tokio::spawn(engine.run());

        let mut peer = Self {
            stream: remote,
            state: HashMap::new(),
            payouts: Vec::new(),
            next_tx: 0,
        };
        assert_eq!(peer.recv().await.kind, MessageKind::Register);
        peer.send(Message::new(MessageKind::Registered, Vec::new())).await;
        peer.send(Message::new(MessageKind::Ready, Vec::new())).await;
        peer
    }

    async fn recv(&mut self) -> Message {
        tokio::time::timeout(WAIT, self.stream.recv())
            .await
            .expect("timed out")
            .expect("stream failed")
            .expect("stream closed")
    }

    async fn send(&self, msg: Message) {
        self.stream.send(msg).await.expect("send failed");
    }

    /// Invoke as `caller`, attaching `ptn` tokens, and serve the contract's
    /// requests until it finishes.
    async fn call(&mut self, kind: MessageKind, caller: &str, ptn: u64, args: &[&str]) -> Result<String, String> {
        self.next_tx += 1;
        let info = format!(
            r#"{{"invoke_address":"{caller}","invoke_tokens":[{{"amount":{ptn},"asset":{{"asset_id":"PTN"}}}}]}}"#
        );
        let mut all = vec![info.into_bytes()];
        all.extend(args.iter().map(|a| a.as_bytes().to_vec()));
        let payload = codec::encode("ChaincodeInput", &ChaincodeInput { args: all }).unwrap();
        let msg = Message::new(kind, payload).with_context("ch", format!("tx-{}", self.next_tx));
        self.send(msg).await;

        loop {
            let msg = self.recv().await;
            let reply = match msg.kind {
                MessageKind::GetState => {
                    let req: GetStateRequest = codec::decode("get", &msg.payload).unwrap();
                    self.state.get(&req.key).cloned().unwrap_or_default()
                }
                MessageKind::PutState => {
                    let req: PutStateRequest = codec::decode("put", &msg.payload).unwrap();
                    self.state.insert(req.key, req.value);
                    Vec::new()
                }
                MessageKind::DelState => {
                    let req: DelStateRequest = codec::decode("del", &msg.payload).unwrap();
                    self.state.remove(&req.key);
                    Vec::new()
                }
                MessageKind::PayOutToken => {
                    self.payouts.push(codec::decode("pay", &msg.payload).unwrap());
                    Vec::new()
                }
                MessageKind::Completed => {
                    let response: Response = codec::decode("Response", &msg.payload).unwrap();
                    return Ok(String::from_utf8(response.payload).unwrap());
                }
                MessageKind::Error => return Err(String::from_utf8_lossy(&msg.payload).into_owned()),
                other => panic!("unexpected {other}"),
            };
            self.send(msg.reply(MessageKind::Response, reply)).await;
        }
    }

    async fn invoke(&mut self, caller: &str, args: &[&str]) -> Result<String, String> {
        self.call(MessageKind::Transaction, caller, 0, args).await
    }

    fn balance(&self, address: &str) -> String {
        self.state
            .get(&balance_key(address))
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .unwrap_or_default()
    }
}

#[tokio::test]
async fn test_init_records_owner() {
    let mut peer = LedgerPeer::start().await;
    let owner = peer.call(MessageKind::Init, "P1owner", 0, &["init"]).await.unwrap();

    assert_eq!(owner, "P1owner");
    assert_eq!(peer.state[OWNER_KEY], b"P1owner".to_vec());
    assert_eq!(peer.invoke("P1anyone", &["owner"]).await.unwrap(), "P1owner");
}

#[tokio::test]
async fn test_deposit_transfer_withdraw() {
    let mut peer = LedgerPeer::start().await;

    let after_deposit = peer
        .call(MessageKind::Transaction, "P1alice", 100, &["deposit"])
        .await
        .unwrap();
    assert_eq!(after_deposit, "100");

    let remaining = peer.invoke("P1alice", &["transfer", "P1bob", "30"]).await.unwrap();
    assert_eq!(remaining, "70");
    assert_eq!(peer.balance("P1bob"), "30");

    let left = peer.invoke("P1bob", &["withdraw", "10"]).await.unwrap();
    assert_eq!(left, "20");
    assert_eq!(peer.payouts.len(), 1);
    assert_eq!(peer.payouts[0].address, "P1bob");
    assert_eq!(peer.payouts[0].amount, 10);
    assert_eq!(peer.payouts[0].asset.asset_id, "PTN");

    assert_eq!(peer.invoke("P1carol", &["balance", "P1alice"]).await.unwrap(), "70");
    assert_eq!(peer.invoke("P1carol", &["balance"]).await.unwrap(), "0");
}

#[tokio::test]
async fn test_overdraft_refused_without_side_effects() {
    let mut peer = LedgerPeer::start().await;
    peer.call(MessageKind::Transaction, "P1alice", 5, &["deposit"]).await.unwrap();

    let err = peer.invoke("P1alice", &["withdraw", "6"]).await.unwrap_err();
    assert_eq!(err, "insufficient balance: have 5, need 6");
    assert_eq!(peer.balance("P1alice"), "5");
    assert!(peer.payouts.is_empty());
}

#[tokio::test]
async fn test_bad_calls() {
    let mut peer = LedgerPeer::start().await;

    assert_eq!(
        peer.invoke("P1alice", &["deposit"]).await.unwrap_err(),
        "no PTN attached to deposit"
    );
    assert_eq!(
        peer.invoke("P1alice", &["transfer", "P1bob"]).await.unwrap_err(),
        "transfer expects 2 argument(s), got 1"
    );
    assert_eq!(
        peer.invoke("P1alice", &["withdraw", "lots"]).await.unwrap_err(),
        "invalid amount: lots"
    );
    assert_eq!(
        peer.invoke("P1alice", &["mint"]).await.unwrap_err(),
        "unknown function: mint"
    );
}

#[tokio::test]
async fn test_corrupt_balance_reported() {
    let mut peer = LedgerPeer::start().await;
    peer.state.insert(balance_key("P1alice"), b"not-a-number".to_vec());

    assert_eq!(
        peer.invoke("P1alice", &["balance"]).await.unwrap_err(),
        "corrupt balance for P1alice"
    );
}
