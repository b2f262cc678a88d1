//! TCP duplex stream.
//!
//! Each message is one frame: a 4-byte big-endian length followed by the
//! bincode-encoded [`Message`]. The read and write halves are locked
//! independently so a pending `recv` never blocks a `send`.

use crate::errors::TransportError;
use crate::ports::outbound::DuplexStream;
use async_trait::async_trait;
use shared_types::{codec, Message};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

/// A framed TCP connection to the peer.
pub struct TcpTransport {
    reader: Mutex<OwnedReadHalf>,
    writer: Mutex<OwnedWriteHalf>,
    max_frame_bytes: usize,
}

impl TcpTransport {
    /// Connect to `addr`.
    ///
    /// # Errors
    ///
    /// `Io` if the connection cannot be established.
    #[instrument(skip(addr))]
    pub async fn connect(addr: impl ToSocketAddrs, max_frame_bytes: usize) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(peer = ?stream.peer_addr().ok(), "Connected");
        Ok(Self::from_stream(stream, max_frame_bytes))
    }

    /// Wrap an already connected socket.
    pub fn from_stream(stream: TcpStream, max_frame_bytes: usize) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            max_frame_bytes,
        }
    }

    fn check_len(&self, size: usize) -> Result<(), TransportError> {
        if size > self.max_frame_bytes || u32::try_from(size).is_err() {
            return Err(TransportError::FrameTooLarge {
                size,
                max: self.max_frame_bytes,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DuplexStream for TcpTransport {
    async fn send(&self, msg: Message) -> Result<(), TransportError> {
        let bytes = codec::encode("Message", &msg)?;
        self.check_len(bytes.len())?;
        #[allow(clippy::cast_possible_truncation)]
        let len = bytes.len() as u32;

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&len.to_be_bytes())
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        writer
            .write_all(&bytes)
            .await
            .map_err(|e| TransportError::Send(e.to_string()))?;
        writer
            .flush()
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&self) -> Result<Option<Message>, TransportError> {
        let mut reader = self.reader.lock().await;

        // End of stream is only clean on a frame boundary.
        let mut len_buf = [0u8; 4];
        let first = reader
            .read(&mut len_buf[..1])
            .await
            .map_err(|e| TransportError::Recv(e.to_string()))?;
        if first == 0 {
            debug!("Connection closed by peer");
            return Ok(None);
        }
        reader
            .read_exact(&mut len_buf[1..])
            .await
            .map_err(|e| TransportError::Recv(format!("truncated frame header: {e}")))?;
        let len = u32::from_be_bytes(len_buf) as usize;
        self.check_len(len)?;

        let mut payload = vec![0u8; len];
        reader
            .read_exact(&mut payload)
            .await
            .map_err(|e| TransportError::Recv(e.to_string()))?;

        Ok(Some(codec::decode("Message", &payload)?))
    }

    async fn close_send(&self) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(|e| TransportError::CloseSend(e.to_string()))
    }
}
