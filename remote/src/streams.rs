use futures::SinkExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::instrument;

use crate::protocol::{Header, HeaderCodec, HeaderError};

/// Send side of a transfer connection: one framed header, then raw payload bytes.
///
/// Generic over the underlying writer type - works with TCP or any AsyncWrite.
#[derive(Debug)]
pub struct SendStream<W = TcpStream> {
    framed: tokio_util::codec::FramedWrite<W, HeaderCodec>,
}

impl<W: AsyncWrite + Unpin> SendStream<W> {
    pub fn new(stream: W) -> Self {
        let framed = tokio_util::codec::FramedWrite::new(stream, HeaderCodec::default());
        Self { framed }
    }

    /// Writes the header and flushes it to the connection.
    #[instrument(level = "debug", skip(self))]
    pub async fn send_header(&mut self, header: &Header) -> Result<(), HeaderError> {
        self.framed.send(header.clone()).await
    }

    /// Writes a chunk of payload in full.
    ///
    /// The header must have been sent already: payload goes straight to the connection,
    /// bypassing the framed write buffer.
    pub async fn send_data(&mut self, data: &[u8]) -> std::io::Result<()> {
        debug_assert!(self.framed.write_buffer().is_empty());
        self.framed.get_mut().write_all(data).await
    }

    /// Shuts down the write side, signalling end-of-stream to the peer.
    pub async fn close(&mut self) -> std::io::Result<()> {
        self.framed.get_mut().shutdown().await
    }
}

/// Receive side of a transfer connection.
///
/// Generic over the underlying reader type - works with TCP or any AsyncRead.
#[derive(Debug)]
pub struct RecvStream<R = TcpStream> {
    framed: tokio_util::codec::FramedRead<R, HeaderCodec>,
}

impl<R: AsyncRead + Unpin> RecvStream<R> {
    pub fn new(stream: R, max_header_len: usize) -> Self {
        let framed =
            tokio_util::codec::FramedRead::new(stream, HeaderCodec::new(max_header_len));
        Self { framed }
    }

    /// Reads until the header delimiter and decodes the header.
    ///
    /// Returns `Ok(None)` if the peer closed the connection before sending anything.
    #[instrument(level = "debug", skip(self))]
    pub async fn recv_header(&mut self) -> Result<Option<Header>, HeaderError> {
        match futures::StreamExt::next(&mut self.framed).await {
            Some(header) => header.map(Some),
            None => Ok(None),
        }
    }

    /// Payload bytes that arrived in the same reads as the header.
    ///
    /// Callers consume (and clear) these before reading more from [`Self::get_mut`].
    pub fn residual_mut(&mut self) -> &mut bytes::BytesMut {
        self.framed.read_buffer_mut()
    }

    /// Get mutable reference to the underlying stream for raw data transfer
    pub fn get_mut(&mut self) -> &mut R {
        self.framed.get_mut()
    }
}
