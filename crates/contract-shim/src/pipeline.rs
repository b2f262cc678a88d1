//! # Invocation Pipeline
//!
//! Runs user contract code for one INIT or TRANSACTION and turns the result
//! into a COMPLETED or ERROR message. The pipeline never sends that message
//! itself and never touches engine state: it queues a
//! [`PendingTransition`] for the engine loop.
//!
//! ## Outcome Mapping
//!
//! | Result | Outbound |
//! |--------|----------|
//! | payload does not decode | ERROR with the decode error |
//! | INIT with no arguments | COMPLETED, status 200, "Restart container" |
//! | status < 400 | COMPLETED carrying the `Response` |
//! | status >= 400 | ERROR carrying the response message |
//! | contract panicked | ERROR describing the panic |

use crate::adapters::correlator::Correlator;
use crate::cert::CertificateDecoder;
use crate::domain::state_machine::{Invocation, PendingTransition};
use crate::operations::Operations;
use crate::ports::inbound::Contract;
use crate::stub::CallContext;
use shared_types::{codec, ChaincodeInput, Message, MessageKind, Response};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Message returned for an INIT carrying no arguments.
pub const RESTART_MESSAGE: &str = "Restart container";

/// Dispatches invocations onto their own tasks.
#[derive(Clone)]
pub struct Pipeline {
    contract: Arc<dyn Contract>,
    correlator: Correlator,
    decoder: Arc<dyn CertificateDecoder>,
    transitions: mpsc::UnboundedSender<PendingTransition>,
}

impl Pipeline {
    /// Build a pipeline that queues outcomes on `transitions`.
    pub fn new(
        contract: Arc<dyn Contract>,
        correlator: Correlator,
        decoder: Arc<dyn CertificateDecoder>,
        transitions: mpsc::UnboundedSender<PendingTransition>,
    ) -> Self {
        Self {
            contract,
            correlator,
            decoder,
            transitions,
        }
    }

    /// Run `invocation` for `msg` on a new task. Returns immediately.
    pub fn dispatch(&self, invocation: Invocation, msg: Message) {
        let pipeline = self.clone();
        tokio::spawn(async move {
            let outcome = pipeline.execute(invocation, &msg).await;
            if pipeline.transitions.send(PendingTransition { msg: outcome }).is_err() {
                warn!(tx = %msg.short_tx_id(), "Engine gone; dropping invocation outcome");
            }
        });
    }

    /// Run the contract and build the outbound COMPLETED or ERROR message.
    pub async fn execute(&self, invocation: Invocation, msg: &Message) -> Message {
        let tx = msg.short_tx_id();

        let input: ChaincodeInput = match codec::decode("ChaincodeInput", &msg.payload) {
            Ok(input) => input,
            Err(e) => {
                error!(tx = %tx, error = %e, "Undecodable invocation payload");
                return msg.reply(MessageKind::Error, e.to_string().into_bytes());
            }
        };

        if invocation == Invocation::Init && input.args.is_empty() {
            info!(tx = %tx, "Init without arguments, restarting");
            let response = Response {
                status: Response::OK,
                message: RESTART_MESSAGE.to_string(),
                payload: Vec::new(),
            };
            return completed(msg, &response, None);
        }

        let ops = Operations::new(
            self.correlator.clone(),
            msg.channel_id.clone(),
            msg.tx_id.clone(),
            msg.contract_id.clone(),
        );
        let ctx = Arc::new(CallContext::new(
            ops,
            msg.channel_id.clone(),
            msg.tx_id.clone(),
            input.args,
            msg.proposal.clone().unwrap_or_default(),
            Arc::clone(&self.decoder),
        ));

        let contract = Arc::clone(&self.contract);
        let call_ctx = Arc::clone(&ctx);
        let joined = tokio::spawn(async move {
            match invocation {
                Invocation::Init => contract.init(&*call_ctx).await,
                Invocation::Transaction => contract.invoke(&*call_ctx).await,
            }
        })
        .await;

        let event = ctx.take_event();
        let response = match joined {
            Ok(response) => response,
            Err(e) => {
                error!(tx = %tx, error = %e, "Contract call aborted");
                return msg
                    .reply(MessageKind::Error, format!("contract call aborted: {e}").into_bytes())
                    .with_event(event);
            }
        };

        if response.is_error() {
            warn!(tx = %tx, status = response.status, message = %response.message, "Contract returned an error");
            return msg
                .reply(MessageKind::Error, response.message.into_bytes())
                .with_event(event);
        }

        debug!(tx = %tx, status = response.status, "Contract call completed");
        completed(msg, &response, event)
    }
}

fn completed(msg: &Message, response: &Response, event: Option<shared_types::ContractEvent>) -> Message {
    match codec::encode("Response", response) {
        Ok(bytes) => msg.reply(MessageKind::Completed, bytes).with_event(event),
        Err(e) => msg
            .reply(MessageKind::Error, e.to_string().into_bytes())
            .with_event(event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{MemoryStream, ResponseRouter, SerialSender};
    use crate::cert::X509Decoder;
    use crate::ports::inbound::ContractStub;
    use async_trait::async_trait;

    struct Scripted;

    #[async_trait]
    impl Contract for Scripted {
        async fn init(&self, _stub: &dyn ContractStub) -> Response {
            Response::success(b"ready".to_vec())
        }

        async fn invoke(&self, stub: &dyn ContractStub) -> Response {
            let (function, _) = stub.function_and_parameters();
            match function.as_str() {
                "event" => {
                    stub.set_event("paid", b"10").unwrap();
                    Response::success(Vec::new())
                }
                "fail" => Response::error("insufficient funds"),
                "panic" => panic!("contract bug"),
                _ => Response::success(function.into_bytes()),
            }
        }
    }

    fn pipeline() -> (Pipeline, mpsc::UnboundedReceiver<PendingTransition>) {
        let (local, _remote) = MemoryStream::pair();
        let correlator = Correlator::new(
            Arc::new(ResponseRouter::new()),
            Arc::new(SerialSender::new(Arc::new(local))),
            None,
        );
        let (tx, rx) = mpsc::unbounded_channel();
        (Pipeline::new(Arc::new(Scripted), correlator, Arc::new(X509Decoder), tx), rx)
    }

    fn invocation(kind: MessageKind, args: &[&str]) -> Message {
        let input = ChaincodeInput {
            args: args.iter().map(|a| a.as_bytes().to_vec()).collect(),
        };
        Message::new(kind, codec::encode("ChaincodeInput", &input).unwrap())
            .with_context("ch", "tx-1")
            .with_contract_id(vec![1, 2])
    }

    #[tokio::test]
    async fn test_success_is_completed() {
        let (pipeline, _rx) = pipeline();
        let msg = invocation(MessageKind::Transaction, &["{}", "hello"]);

        let out = pipeline.execute(Invocation::Transaction, &msg).await;
        assert_eq!(out.kind, MessageKind::Completed);
        assert_eq!(out.tx_id, "tx-1");
        assert_eq!(out.contract_id, vec![1, 2]);
        let response: Response = codec::decode("Response", &out.payload).unwrap();
        assert_eq!(response.payload, b"hello".to_vec());
    }

    #[tokio::test]
    async fn test_error_status_is_error_message() {
        let (pipeline, _rx) = pipeline();
        let out = pipeline
            .execute(Invocation::Transaction, &invocation(MessageKind::Transaction, &["{}", "fail"]))
            .await;
        assert_eq!(out.kind, MessageKind::Error);
        assert_eq!(out.payload, b"insufficient funds".to_vec());
    }

    #[tokio::test]
    async fn test_panic_is_reported() {
        let (pipeline, _rx) = pipeline();
        let out = pipeline
            .execute(Invocation::Transaction, &invocation(MessageKind::Transaction, &["{}", "panic"]))
            .await;
        assert_eq!(out.kind, MessageKind::Error);
        assert!(String::from_utf8_lossy(&out.payload).starts_with("contract call aborted"));
    }

    #[tokio::test]
    async fn test_event_attached() {
        let (pipeline, _rx) = pipeline();
        let out = pipeline
            .execute(Invocation::Transaction, &invocation(MessageKind::Transaction, &["{}", "event"]))
            .await;
        assert_eq!(out.kind, MessageKind::Completed);
        assert_eq!(out.event.unwrap().name, "paid");
    }

    #[tokio::test]
    async fn test_init_without_args_restarts() {
        let (pipeline, _rx) = pipeline();
        let out = pipeline
            .execute(Invocation::Init, &invocation(MessageKind::Init, &[]))
            .await;
        assert_eq!(out.kind, MessageKind::Completed);
        let response: Response = codec::decode("Response", &out.payload).unwrap();
        assert_eq!(response.message, RESTART_MESSAGE);
        assert_eq!(response.status, Response::OK);
    }

    #[tokio::test]
    async fn test_garbage_payload_is_error() {
        let (pipeline, _rx) = pipeline();
        let msg = Message::new(MessageKind::Transaction, vec![0xff]).with_context("ch", "tx-1");
        let out = pipeline.execute(Invocation::Transaction, &msg).await;
        assert_eq!(out.kind, MessageKind::Error);
    }

    #[tokio::test]
    async fn test_dispatch_queues_outcome() {
        let (pipeline, mut rx) = pipeline();
        pipeline.dispatch(Invocation::Init, invocation(MessageKind::Init, &["{}", "init"]));

        let pending = rx.recv().await.unwrap();
        assert_eq!(pending.msg.kind, MessageKind::Completed);
        assert_eq!(pending.msg.tx_id, "tx-1");
    }
}
