//! Scripted peer and exerciser contract shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use contract_shim::prelude::*;
use shared_types::{codec, AmountAsset, Asset, ChaincodeInput, Proposal};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Upper bound on any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

pub const CHANNEL: &str = "ch1";
pub const CONTRACT_ID: [u8; 4] = [0xc0, 0xff, 0xee, 0x01];

// =============================================================================
// INSTRUMENTED STREAM
// =============================================================================

/// Wraps the contract's end of a memory pair, recording overlapping sends
/// and optionally failing sends of one kind.
pub struct Instrumented {
    inner: MemoryStream,
    in_flight: AtomicBool,
    pub overlapped: AtomicBool,
    pub sends: AtomicUsize,
    fail_kind: Option<MessageKind>,
}

#[async_trait]
impl DuplexStream for Instrumented {
    async fn send(&self, msg: Message) -> Result<(), TransportError> {
        if Some(msg.kind) == self.fail_kind {
            return Err(TransportError::Send("injected failure".into()));
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        self.sends.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1)).await;
        let result = self.inner.send(msg).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn recv(&self) -> Result<Option<Message>, TransportError> {
        self.inner.recv().await
    }

    async fn close_send(&self) -> Result<(), TransportError> {
        self.inner.close_send().await
    }
}

// =============================================================================
// MOCK PEER
// =============================================================================

/// The peer's end of the stream.
pub struct Peer {
    stream: MemoryStream,
}

impl Peer {
    /// Next message from the contract.
    pub async fn recv(&self) -> Message {
        tokio::time::timeout(WAIT, self.stream.recv())
            .await
            .expect("timed out waiting for the contract")
            .expect("stream failed")
            .expect("stream closed")
    }

    /// Next message, which must be of `kind`.
    pub async fn expect(&self, kind: MessageKind) -> Message {
        let msg = self.recv().await;
        assert_eq!(msg.kind, kind, "unexpected message: {msg:?}");
        msg
    }

    /// Wait for the contract to close its write half.
    pub async fn expect_closed(&self) {
        let next = tokio::time::timeout(WAIT, self.stream.recv())
            .await
            .expect("timed out waiting for close");
        assert!(matches!(next, Ok(None)), "expected end of stream, got {next:?}");
    }

    pub async fn send(&self, msg: Message) {
        self.stream.send(msg).await.expect("peer send failed");
    }

    /// Close the peer's write half; the contract sees end of stream.
    pub async fn close(&self) {
        self.stream.close_send().await.expect("peer close failed");
    }

    /// Reply RESPONSE to `req`.
    pub async fn respond(&self, req: &Message, payload: Vec<u8>) {
        self.send(req.reply(MessageKind::Response, payload)).await;
    }

    /// Reply ERROR to `req`.
    pub async fn fail(&self, req: &Message, text: &str) {
        self.send(req.reply(MessageKind::Error, text.as_bytes().to_vec())).await;
    }

    /// REGISTER -> REGISTERED -> READY.
    pub async fn handshake(&self) {
        let register = self.expect(MessageKind::Register).await;
        let id: shared_types::ContractId = codec::decode("ContractId", &register.payload).unwrap();
        assert_eq!(id.name, "exerciser");
        self.send(Message::new(MessageKind::Registered, Vec::new())).await;
        self.send(Message::new(MessageKind::Ready, Vec::new())).await;
    }

    /// Send a TRANSACTION calling `function` with `params`.
    pub async fn transact(&self, tx: &str, function: &str, params: &[&str]) {
        self.send(invocation(MessageKind::Transaction, tx, function, params)).await;
    }

    /// Send a TRANSACTION carrying a requester certificate id.
    pub async fn transact_with_cert(&self, tx: &str, function: &str, cert_id: Vec<u8>) {
        let msg = invocation(MessageKind::Transaction, tx, function, &[]).with_proposal(Proposal {
            cert_id,
            signed_bytes: Vec::new(),
        });
        self.send(msg).await;
    }

    /// Wait for the outcome of `tx` and decode it.
    pub async fn outcome(&self) -> Outcome {
        let msg = self.recv().await;
        match msg.kind {
            MessageKind::Completed => {
                let response: Response = codec::decode("Response", &msg.payload).unwrap();
                Outcome::Completed(msg.tx_id, response)
            }
            MessageKind::Error => Outcome::Error(msg.tx_id, String::from_utf8_lossy(&msg.payload).into_owned()),
            other => panic!("expected an outcome, got {other}"),
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Completed(String, Response),
    Error(String, String),
}

impl Outcome {
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Outcome::Completed(_, r) => r.payload.clone(),
            Outcome::Error(tx, text) => panic!("{tx} failed: {text}"),
        }
    }

    pub fn error_text(&self) -> &str {
        match self {
            Outcome::Error(_, text) => text,
            Outcome::Completed(tx, _) => panic!("{tx} unexpectedly completed"),
        }
    }
}

pub fn invocation(kind: MessageKind, tx: &str, function: &str, params: &[&str]) -> Message {
    let mut args = vec![
        br#"{"invoke_address":"P1caller","invoke_tokens":[]}"#.to_vec(),
        function.as_bytes().to_vec(),
    ];
    args.extend(params.iter().map(|p| p.as_bytes().to_vec()));
    let input = ChaincodeInput { args };

    Message::new(kind, codec::encode("ChaincodeInput", &input).unwrap())
        .with_context(CHANNEL, tx)
        .with_contract_id(CONTRACT_ID.to_vec())
}

// =============================================================================
// HARNESS
// =============================================================================

pub struct Harness {
    pub peer: Peer,
    pub handle: EngineHandle,
    pub stream: Arc<Instrumented>,
    pub engine: JoinHandle<Result<(), ShimError>>,
}

impl Harness {
    /// Wait for the engine to stop.
    pub async fn finished(self) -> Result<(), ShimError> {
        tokio::time::timeout(WAIT, self.engine)
            .await
            .expect("engine did not stop")
            .expect("engine panicked")
    }
}

/// Start an engine for [`Exerciser`] without performing the handshake.
pub fn spawn_engine(fail_kind: Option<MessageKind>, config: ShimConfig) -> Harness {
    spawn_engine_with(fail_kind, config, Arc::new(X509Decoder))
}

/// As [`spawn_engine`], with a custom certificate decoder.
pub fn spawn_engine_with(
    fail_kind: Option<MessageKind>,
    config: ShimConfig,
    decoder: Arc<dyn CertificateDecoder>,
) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let (local, remote) = MemoryStream::pair();
    let stream = Arc::new(Instrumented {
        inner: local,
        in_flight: AtomicBool::new(false),
        overlapped: AtomicBool::new(false),
        sends: AtomicUsize::new(0),
        fail_kind,
    });

    let config = ShimConfig {
        contract_name: "exerciser".into(),
        ..config
    };
    let (engine, handle) = Engine::with_decoder(stream.clone(), Arc::new(Exerciser), &config, decoder);

    Harness {
        peer: Peer { stream: remote },
        handle,
        stream,
        engine: tokio::spawn(engine.run()),
    }
}

/// Start an engine and bring it to `Ready`.
pub async fn ready_engine() -> Harness {
    let mut harness = spawn_engine(None, ShimConfig::default());
    harness.peer.handshake().await;
    tokio::time::timeout(WAIT, harness.handle.wait_for_state(EngineState::Ready))
        .await
        .expect("engine never became ready")
        .unwrap();
    harness
}

// =============================================================================
// EXERCISER CONTRACT
// =============================================================================

/// Runs one stub operation per function name and reports the result.
pub struct Exerciser;

fn text(value: impl Into<String>) -> Response {
    Response::success(value.into().into_bytes())
}

#[async_trait]
impl Contract for Exerciser {
    async fn init(&self, stub: &dyn ContractStub) -> Response {
        let (function, _) = stub.function_and_parameters();
        text(format!("init:{function}"))
    }

    async fn invoke(&self, stub: &dyn ContractStub) -> Response {
        match run(stub).await {
            Ok(response) => response,
            Err(e) => Response::error(e.to_string()),
        }
    }
}

async fn run(stub: &dyn ContractStub) -> ShimResult<Response> {
    let (function, params) = stub.function_and_parameters();
    let param = |i: usize| params.get(i).cloned().unwrap_or_default();

    let response = match function.as_str() {
        "get" => Response::success(stub.get_state(&param(0)).await?),
        "put" => {
            stub.put_state(&param(0), param(1).as_bytes()).await?;
            text("stored")
        }
        "del" => {
            stub.del_state(&param(0)).await?;
            text("deleted")
        }
        "global" => Response::success(stub.get_global_state(&param(0)).await?),
        "prefix" => {
            let rows = stub.get_state_by_prefix(&param(0)).await?;
            text(rows.iter().map(|kv| kv.key.as_str()).collect::<Vec<_>>().join(","))
        }
        "all" => {
            let state = stub.get_contract_all_state().await?;
            text(state.keys().cloned().collect::<Vec<_>>().join(","))
        }
        "timestamp" => text(stub.get_tx_timestamp(10).await?.seconds.to_string()),
        "config" => text(
            stub.get_system_config()
                .await?
                .chain_parameters
                .deposit_amount_for_jury
                .to_string(),
        ),
        "balance" => {
            let tokens = stub.get_token_balance(&param(0), None).await?;
            text(
                tokens
                    .iter()
                    .map(|t| format!("{}={}", t.asset, t.amount))
                    .collect::<Vec<_>>()
                    .join(","),
            )
        }
        "pay2" => {
            let amount = AmountAsset {
                amount: 5,
                asset: Asset::new("PTN"),
            };
            stub.pay_out_token("P1first", &amount, 0).await?;
            stub.pay_out_token("P1second", &amount, 0).await?;
            text("paid")
        }
        "define" => {
            stub.define_token(1, b"{\"name\":\"ART\"}", "P1caller").await?;
            text("defined")
        }
        "supply" => {
            stub.supply_token(b"ART", b"", 100, "P1caller").await?;
            text("supplied")
        }
        "outchain" => Response::success(stub.outchain_call("eth", "balance", b"0x01").await?),
        "send_jury" => Response::success(stub.send_jury(1, b"question", b"yes").await?),
        "recv_jury" => {
            let answers = stub.recv_jury(1, b"question", 30).await?;
            text(
                answers
                    .iter()
                    .map(|a| format!("{}:{}", a.address, String::from_utf8_lossy(&a.answer)))
                    .collect::<Vec<_>>()
                    .join(","),
            )
        }
        "nested" => stub.invoke_chaincode(&param(0), vec![b"ping".to_vec()], "").await,
        "event" => {
            stub.set_event("touched", b"1")?;
            text("evented")
        }
        "cert" => Response::success(stub.get_requester_cert().await?),
        "cert_valid" => match stub.is_requester_cert_valid().await {
            Ok(()) => text("valid"),
            Err(rejection) => Response::error(rejection.to_string()),
        },
        "fail" => Response::error("refused by contract"),
        other => Response::error(format!("unknown function {other}")),
    };
    Ok(response)
}
