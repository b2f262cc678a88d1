//! # Protocol Engine
//!
//! One engine per connection. A reader task pulls messages off the stream;
//! the engine loop is the only consumer of those messages, of the
//! pipeline's transition queue, and the only writer of [`EngineState`].
//!
//! ## Loop Priorities
//!
//! 1. Send failures, from operation requests or outcome sends (terminal)
//! 2. Queued invocation outcomes, so a finished call's transition is applied
//!    before the next inbound message
//! 3. Inbound messages
//!
//! Inbound messages go through the inbound table; queued outcomes go through
//! the local table. Only the latter knows COMPLETED.
//!
//! ## Exit
//!
//! The loop ends when the peer closes the stream (`Ok`) or on any transport
//! failure (`Err`). Either way the router is closed, so every blocked
//! operation call returns `ConnectionClosed`, and the write half is closed.

use crate::adapters::correlator::Correlator;
use crate::adapters::router::ResponseRouter;
use crate::adapters::sender::SerialSender;
use crate::cert::{CertificateDecoder, X509Decoder};
use crate::config::ShimConfig;
use crate::domain::state_machine::{
    illegal_transition_text, local_transition, transition, Action, EngineState, PendingTransition,
};
use crate::errors::{ShimError, TransportError};
use crate::pipeline::Pipeline;
use crate::ports::inbound::Contract;
use crate::ports::outbound::DuplexStream;
use shared_types::{codec, ContractId, Message, MessageKind};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

type Inbound = Result<Option<Message>, TransportError>;

/// Observes a running engine from outside.
#[derive(Clone)]
pub struct EngineHandle {
    state: watch::Receiver<EngineState>,
    router: Arc<ResponseRouter>,
}

impl EngineHandle {
    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    /// Wait until the engine reaches `target`.
    ///
    /// # Errors
    ///
    /// `ConnectionClosed` if the engine stops first.
    pub async fn wait_for_state(&mut self, target: EngineState) -> Result<(), ShimError> {
        self.state
            .wait_for(|state| *state == target)
            .await
            .map(drop)
            .map_err(|_| ShimError::ConnectionClosed)
    }

    /// Number of operation calls waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.router.pending_count()
    }
}

/// The contract-side protocol engine.
pub struct Engine {
    stream: Arc<dyn DuplexStream>,
    sender: Arc<SerialSender>,
    router: Arc<ResponseRouter>,
    pipeline: Pipeline,
    transitions: mpsc::UnboundedReceiver<PendingTransition>,
    failures_tx: mpsc::UnboundedSender<ShimError>,
    failures: mpsc::UnboundedReceiver<ShimError>,
    state: EngineState,
    state_tx: watch::Sender<EngineState>,
    contract_name: String,
}

impl Engine {
    /// Wire an engine for `contract` over `stream`.
    pub fn new(stream: Arc<dyn DuplexStream>, contract: Arc<dyn Contract>, config: &ShimConfig) -> (Self, EngineHandle) {
        Self::with_decoder(stream, contract, config, Arc::new(X509Decoder))
    }

    /// As [`new`](Self::new), with a custom certificate decoder.
    pub fn with_decoder(
        stream: Arc<dyn DuplexStream>,
        contract: Arc<dyn Contract>,
        config: &ShimConfig,
        decoder: Arc<dyn CertificateDecoder>,
    ) -> (Self, EngineHandle) {
        let router = Arc::new(ResponseRouter::new());
        let sender = Arc::new(SerialSender::new(Arc::clone(&stream)));
        let (failures_tx, failures) = mpsc::unbounded_channel();
        let correlator = Correlator::new(Arc::clone(&router), Arc::clone(&sender), config.call_timeout)
            .with_failure_sink(failures_tx.clone());

        let (transitions_tx, transitions) = mpsc::unbounded_channel();
        let pipeline = Pipeline::new(contract, correlator, decoder, transitions_tx);
        let (state_tx, state_rx) = watch::channel(EngineState::Created);

        let handle = EngineHandle {
            state: state_rx,
            router: Arc::clone(&router),
        };
        let engine = Self {
            stream,
            sender,
            router,
            pipeline,
            transitions,
            failures_tx,
            failures,
            state: EngineState::Created,
            state_tx,
            contract_name: config.contract_name.clone(),
        };
        (engine, handle)
    }

    /// Register with the peer and serve until the connection ends.
    ///
    /// # Errors
    ///
    /// The transport error that ended the connection.
    pub async fn run(mut self) -> Result<(), ShimError> {
        let (inbound_tx, inbound_rx) = mpsc::channel(1);
        let reader = spawn_reader(Arc::clone(&self.stream), inbound_tx);

        let result = self.serve(inbound_rx).await;

        reader.abort();
        self.router.close();
        if let Err(e) = self.sender.close().await {
            debug!(error = %e, "Close send failed");
        }

        match &result {
            Ok(()) => info!(contract = %self.contract_name, "Connection closed by peer"),
            Err(e) => error!(contract = %self.contract_name, error = %e, "Connection failed"),
        }
        result
    }

    async fn serve(&mut self, mut inbound: mpsc::Receiver<Inbound>) -> Result<(), ShimError> {
        self.register().await?;

        loop {
            tokio::select! {
                biased;

                Some(err) = self.failures.recv() => {
                    return Err(err);
                }
                Some(pending) = self.transitions.recv() => {
                    self.apply_local(pending);
                }
                received = inbound.recv() => match received {
                    Some(Ok(Some(msg))) => self.handle_message(msg).await?,
                    Some(Ok(None)) | None => return Ok(()),
                    Some(Err(e)) => return Err(e.into()),
                },
            }
        }
    }

    async fn register(&self) -> Result<(), ShimError> {
        let id = ContractId {
            name: self.contract_name.clone(),
        };
        let msg = Message::new(MessageKind::Register, codec::encode("ContractId", &id)?);
        info!(contract = %self.contract_name, "Registering with peer");
        self.sender.send(msg).await
    }

    /// Apply one inbound message.
    ///
    /// # Errors
    ///
    /// Only a failed send of the illegal-transition ERROR.
    #[instrument(skip_all, fields(tx = %msg.short_tx_id(), kind = %msg.kind))]
    async fn handle_message(&mut self, msg: Message) -> Result<(), ShimError> {
        if msg.kind == MessageKind::Keepalive {
            return Ok(());
        }
        debug!(state = %self.state, "Handling message");

        let awaiting_response = self.router.pending_count() > 0;
        let Some(step) = transition(self.state, msg.kind, awaiting_response) else {
            let text = illegal_transition_text(self.state, &msg);
            warn!(state = %self.state, "Illegal transition");
            let reply = Message::new(MessageKind::Error, text.into_bytes())
                .with_context(msg.channel_id, msg.tx_id);
            return self.sender.send(reply).await;
        };

        self.set_state(step.next);
        match step.action {
            Action::None => {}
            Action::Dispatch(invocation) => self.pipeline.dispatch(invocation, msg),
            Action::Deliver => {
                if let Err(e) = self.router.deliver(msg) {
                    warn!(error = %e, "Undeliverable response");
                }
            }
        }
        Ok(())
    }

    /// Apply a queued invocation outcome and send it on.
    fn apply_local(&mut self, pending: PendingTransition) {
        let PendingTransition { msg } = pending;

        match local_transition(self.state, msg.kind) {
            Some(next) => self.set_state(next),
            None => warn!(
                tx = %msg.short_tx_id(),
                kind = %msg.kind,
                state = %self.state,
                "Outcome not applicable in current state"
            ),
        }

        let outcome = self.sender.send_async(msg);
        let failures = self.failures_tx.clone();
        tokio::spawn(async move {
            if let Ok(Err(e)) = outcome.await {
                let _ = failures.send(e);
            }
        });
    }

    fn set_state(&mut self, next: EngineState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "State changed");
            self.state = next;
            self.state_tx.send_replace(next);
        }
    }
}

/// Read the stream until it ends or fails, forwarding every result.
fn spawn_reader(stream: Arc<dyn DuplexStream>, inbound: mpsc::Sender<Inbound>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let received = stream.recv().await;
            let last = !matches!(received, Ok(Some(_)));
            if inbound.send(received).await.is_err() || last {
                break;
            }
        }
    })
}
