//! In-process duplex stream built from two unbounded channels.

use crate::errors::TransportError;
use crate::ports::outbound::DuplexStream;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::Message;
use tokio::sync::mpsc;

/// One end of an in-process stream. Create both ends with [`MemoryStream::pair`].
pub struct MemoryStream {
    outgoing: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    incoming: tokio::sync::Mutex<mpsc::UnboundedReceiver<Message>>,
}

impl MemoryStream {
    /// Two connected ends: whatever one sends, the other receives.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (Self::from_parts(a_tx, b_rx), Self::from_parts(b_tx, a_rx))
    }

    fn from_parts(outgoing: mpsc::UnboundedSender<Message>, incoming: mpsc::UnboundedReceiver<Message>) -> Self {
        Self {
            outgoing: Mutex::new(Some(outgoing)),
            incoming: tokio::sync::Mutex::new(incoming),
        }
    }
}

#[async_trait]
impl DuplexStream for MemoryStream {
    async fn send(&self, msg: Message) -> Result<(), TransportError> {
        let guard = self.outgoing.lock();
        let outgoing = guard.as_ref().ok_or(TransportError::Closed)?;
        outgoing.send(msg).map_err(|_| TransportError::Closed)
    }

    async fn recv(&self) -> Result<Option<Message>, TransportError> {
        Ok(self.incoming.lock().await.recv().await)
    }

    async fn close_send(&self) -> Result<(), TransportError> {
        self.outgoing.lock().take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::MessageKind;

    #[tokio::test]
    async fn test_pair_is_crossed() {
        let (a, b) = MemoryStream::pair();
        a.send(Message::new(MessageKind::Keepalive, Vec::new())).await.unwrap();
        b.send(Message::new(MessageKind::Ready, Vec::new())).await.unwrap();

        assert_eq!(b.recv().await.unwrap().unwrap().kind, MessageKind::Keepalive);
        assert_eq!(a.recv().await.unwrap().unwrap().kind, MessageKind::Ready);
    }

    #[tokio::test]
    async fn test_close_send_ends_other_side() {
        let (a, b) = MemoryStream::pair();
        a.close_send().await.unwrap();

        assert!(b.recv().await.unwrap().is_none());
        assert!(matches!(
            a.send(Message::new(MessageKind::Keepalive, Vec::new())).await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_send_to_dropped_peer_fails() {
        let (a, b) = MemoryStream::pair();
        drop(b);
        assert!(a.send(Message::new(MessageKind::Keepalive, Vec::new())).await.is_err());
    }
}
