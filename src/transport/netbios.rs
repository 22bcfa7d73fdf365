use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, instrument, trace};

use crate::config::SmbConfig;
use crate::core::codec::{write_session_header, NetbiosCodec, KEEP_ALIVE_FRAME};
use crate::core::packet::HEADER_LEN;
use crate::error::{constants, ProtocolError, Result};
use crate::transport::Transport;
use crate::utils::timeout::with_timeout;

/// NetBIOS session transport over a tokio byte stream.
///
/// Reads go through a [`FramedRead`] so keep-alives are dropped and partial
/// frames survive a cancelled receive. Writes go straight to the stream from
/// the caller's buffer.
pub struct NetbiosTransport<S> {
    reader: FramedRead<ReadHalf<S>, NetbiosCodec>,
    writer: WriteHalf<S>,
}

impl<S> NetbiosTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    pub fn new(stream: S, max_frame_size: usize) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        Self {
            reader: FramedRead::new(read_half, NetbiosCodec::new(max_frame_size)),
            writer: write_half,
        }
    }

    /// Send a session keep-alive frame
    pub async fn send_keep_alive(&mut self) -> Result<()> {
        trace!("Sending NetBIOS keep-alive");
        self.writer.write_all(&KEEP_ALIVE_FRAME).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

impl NetbiosTransport<TcpStream> {
    /// Connect to the configured server address
    #[instrument(skip(config), fields(address = %config.client.address))]
    pub async fn connect(config: &SmbConfig) -> Result<Self> {
        let stream = with_timeout(
            config.client.connection_timeout,
            TcpStream::connect(config.client.address.as_str()),
        )
        .await?
        .map_err(|e| ProtocolError::TransportError(format!("Connect failed: {e}")))?;

        stream.set_nodelay(config.transport.nodelay)?;
        info!("Connected to SMB server");

        Ok(Self::new(stream, config.transport.max_frame_size))
    }
}

#[async_trait]
impl<S> Transport for NetbiosTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    async fn send(&mut self, frame: &mut [u8]) -> Result<()> {
        let len = frame
            .len()
            .checked_sub(HEADER_LEN)
            .ok_or_else(|| ProtocolError::TransportError(constants::ERR_BUFFER_TOO_SMALL.into()))?;
        write_session_header(frame, len)?;

        self.writer.write_all(frame).await?;
        self.writer.flush().await?;
        debug!(len, "Sent NetBIOS session message");
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        let payload = match self.reader.next().await {
            Some(frame) => frame?,
            None => return Err(ProtocolError::ConnectionClosed),
        };

        let len = payload.len();
        let room = buf.len().saturating_sub(HEADER_LEN);
        if len > room {
            debug!(len, room, "{}", constants::ERR_RECEIVE_BUFFER_TOO_SMALL);
            return Err(ProtocolError::OversizedPacket(len));
        }

        buf[HEADER_LEN..HEADER_LEN + len].copy_from_slice(&payload);
        debug!(len, "Received NetBIOS session message");
        Ok(len)
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}
