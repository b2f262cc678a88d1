//! Serialized Sender - the single path from the shim onto the stream.
//!
//! Every outbound message passes through one lock, so two messages from the
//! same engine never overlap on the wire.

use crate::errors::ShimError;
use crate::ports::outbound::DuplexStream;
use shared_types::Message;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, error};

/// Writes messages to a [`DuplexStream`] one at a time.
pub struct SerialSender {
    stream: Arc<dyn DuplexStream>,
    lock: Mutex<()>,
}

impl SerialSender {
    /// Wrap a stream.
    pub fn new(stream: Arc<dyn DuplexStream>) -> Self {
        Self {
            stream,
            lock: Mutex::new(()),
        }
    }

    /// Send `msg`, waiting for any send already in progress to finish first.
    ///
    /// # Errors
    ///
    /// The transport's error, wrapped.
    pub async fn send(&self, msg: Message) -> Result<(), ShimError> {
        let kind = msg.kind;
        let tx = msg.short_tx_id().to_owned();

        let _guard = self.lock.lock().await;
        match self.stream.send(msg).await {
            Ok(()) => {
                debug!(tx = %tx, kind = %kind, "Sent message");
                Ok(())
            }
            Err(e) => {
                error!(tx = %tx, kind = %kind, error = %e, "Send failed");
                Err(e.into())
            }
        }
    }

    /// Send `msg` on a separate task. The outcome arrives on the returned
    /// receiver: `Ok(())` once written, or the send error.
    pub fn send_async(self: &Arc<Self>, msg: Message) -> oneshot::Receiver<Result<(), ShimError>> {
        let (tx, rx) = oneshot::channel();
        let sender = Arc::clone(self);
        tokio::spawn(async move {
            let result = sender.send(msg).await;
            // Nobody may be listening any more; that is fine.
            let _ = tx.send(result);
        });
        rx
    }

    /// Close the write half of the stream.
    ///
    /// # Errors
    ///
    /// The transport's error, wrapped.
    pub async fn close(&self) -> Result<(), ShimError> {
        let _guard = self.lock.lock().await;
        self.stream.close_send().await.map_err(Into::into)
    }
}
