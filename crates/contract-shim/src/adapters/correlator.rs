//! Request/Response Correlator - "send a request, wait for its reply".
//!
//! The write and the reply race each other: the reply can arrive before the
//! send task reports success. The call therefore waits on both, treats a
//! successful send as progress only, and returns on the reply or on a send
//! error, whichever comes first.
//!
//! A failed request send is terminal for the connection. Besides returning
//! it to the caller, the correlator reports it on the failure sink so the
//! engine loop can end the connection.

use crate::adapters::router::ResponseRouter;
use crate::adapters::sender::SerialSender;
use crate::domain::correlation::CorrelationKey;
use crate::errors::{ShimError, TransportError};
use shared_types::Message;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// Issues requests on the stream and waits for their correlated replies.
#[derive(Clone)]
pub struct Correlator {
    router: Arc<ResponseRouter>,
    sender: Arc<SerialSender>,
    call_timeout: Option<Duration>,
    failures: Option<mpsc::UnboundedSender<ShimError>>,
}

impl Correlator {
    /// Build a correlator. `call_timeout` of `None` waits for as long as the
    /// connection lives.
    pub fn new(router: Arc<ResponseRouter>, sender: Arc<SerialSender>, call_timeout: Option<Duration>) -> Self {
        Self {
            router,
            sender,
            call_timeout,
            failures: None,
        }
    }

    /// Report every failed request send on `failures`.
    #[must_use]
    pub fn with_failure_sink(mut self, failures: mpsc::UnboundedSender<ShimError>) -> Self {
        self.failures = Some(failures);
        self
    }

    /// The router replies are delivered through.
    pub fn router(&self) -> &Arc<ResponseRouter> {
        &self.router
    }

    /// The sender requests are written through.
    pub fn sender(&self) -> &Arc<SerialSender> {
        &self.sender
    }

    /// Send `msg` and return the message the peer answers it with.
    ///
    /// The response slot is removed on every return path.
    ///
    /// # Errors
    ///
    /// - `DuplicateCorrelation` / `RouterClosed` from slot creation
    /// - the send error if the write fails
    /// - `ConnectionClosed` if the connection ends while waiting
    /// - `Timeout` if a call timeout is configured and expires
    #[instrument(skip_all, fields(tx = %msg.short_tx_id(), kind = %msg.kind))]
    pub async fn call(&self, msg: Message) -> Result<Message, ShimError> {
        let kind = msg.kind;
        match self.call_timeout {
            Some(after) => tokio::time::timeout(after, self.exchange(msg))
                .await
                .map_err(|_| ShimError::Timeout { kind, after })?,
            None => self.exchange(msg).await,
        }
    }

    async fn exchange(&self, msg: Message) -> Result<Message, ShimError> {
        let mut slot = self.router.create_slot(CorrelationKey::of(&msg))?;
        let mut sent = self.sender.send_async(msg);
        let mut written = false;

        loop {
            tokio::select! {
                result = &mut sent, if !written => match result {
                    Ok(Ok(())) => written = true,
                    Ok(Err(e)) => return Err(self.report(e)),
                    Err(_) => return Err(ShimError::ConnectionClosed),
                },
                reply = slot.recv() => {
                    let reply = reply?;
                    debug!(kind = %reply.kind, "Received reply");
                    return Ok(reply);
                }
            }
        }
    }

    /// Hand a send failure to the sink and return the caller's copy.
    fn report(&self, err: ShimError) -> ShimError {
        let Some(failures) = &self.failures else {
            return err;
        };
        let copy = match &err {
            ShimError::Transport(TransportError::Send(detail)) => TransportError::Send(detail.clone()).into(),
            other => TransportError::Send(other.to_string()).into(),
        };
        if failures.send(err).is_err() {
            warn!("Engine gone; send failure not reported");
        }
        copy
    }
}
