//! Receiving side: one accepted connection, one output file.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::instrument;

use crate::error::SessionError;
use crate::protocol::HeaderError;
use crate::streams::RecvStream;

/// State of one incoming transfer.
///
/// The session exclusively owns its connection. Reads and writes are strictly sequential: the
/// next read is only issued once the previous chunk has been written to the output file.
#[derive(Debug)]
pub struct ConnectionSession<R = tokio::net::TcpStream> {
    stream: RecvStream<R>,
    output_dir: std::path::PathBuf,
    chunk_size: usize,
}

impl<R: tokio::io::AsyncRead + Unpin> ConnectionSession<R> {
    pub fn new(
        stream: R,
        output_dir: &std::path::Path,
        config: &common::TransferConfig,
    ) -> Self {
        Self {
            stream: RecvStream::new(stream, config.max_header_len),
            output_dir: output_dir.to_path_buf(),
            chunk_size: config.chunk_size,
        }
    }

    /// Resolves the announced name inside the output directory.
    ///
    /// Only a single plain path component is accepted so a peer cannot write outside of
    /// `output_dir`.
    fn destination_path(&self, file_name: &str) -> Result<std::path::PathBuf, SessionError> {
        let mut components = std::path::Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(std::path::Component::Normal(name)), None)
                if !file_name.contains(['/', '\\']) =>
            {
                Ok(self.output_dir.join(name))
            }
            _ => Err(SessionError::UnsafeFileName(file_name.to_string())),
        }
    }

    /// Runs the session to completion.
    ///
    /// Succeeds iff exactly the announced number of payload bytes arrived and the peer then
    /// closed the connection. On failure the output file (if it was created) keeps whatever
    /// payload was received.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> Result<common::Summary, SessionError> {
        let header = match self.stream.recv_header().await {
            Ok(Some(header)) => header,
            Ok(None) => {
                return Err(SessionError::HeaderRead(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed before header",
                )));
            }
            Err(HeaderError::Io(error)) => return Err(SessionError::HeaderRead(error)),
            Err(error) => return Err(SessionError::HeaderMalformed(error)),
        };
        tracing::info!(
            "Receiving {:?} ({} bytes)",
            header.file_name(),
            header.byte_count()
        );
        let path = self.destination_path(header.file_name())?;
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(|source| SessionError::OutputOpen {
                path: path.clone(),
                source,
            })?;
        let body_result = self
            .receive_body(&mut file, &path, header.byte_count())
            .await;
        // flush on every path so a partial file holds exactly what was received
        let flush_result = file
            .flush()
            .await
            .map_err(|source| SessionError::OutputWrite {
                path: path.clone(),
                source,
            });
        body_result?;
        flush_result?;
        Ok(common::Summary {
            file_name: header.file_name().to_string(),
            bytes_transferred: header.byte_count(),
        })
    }

    async fn receive_body(
        &mut self,
        file: &mut tokio::fs::File,
        path: &std::path::Path,
        byte_count: u64,
    ) -> Result<(), SessionError> {
        let write_error = |source| SessionError::OutputWrite {
            path: path.to_path_buf(),
            source,
        };
        let mut bytes_remaining = byte_count;
        // the header read may have pulled in the start of the payload
        let residual = self.stream.residual_mut();
        if !residual.is_empty() {
            let usable = residual
                .len()
                .min(usize::try_from(bytes_remaining).unwrap_or(usize::MAX));
            file.write_all(&residual[..usable])
                .await
                .map_err(write_error)?;
            bytes_remaining -= usable as u64;
            tracing::debug!("Wrote {usable} residual bytes from header read");
            if usable < residual.len() {
                return Err(SessionError::TrailingData {
                    expected: byte_count,
                });
            }
            residual.clear();
        }
        let reader = self.stream.get_mut();
        let mut buf = vec![0u8; self.chunk_size];
        while bytes_remaining > 0 {
            let to_read = buf
                .len()
                .min(usize::try_from(bytes_remaining).unwrap_or(usize::MAX));
            let n = reader
                .read(&mut buf[..to_read])
                .await
                .map_err(SessionError::BodyRead)?;
            if n == 0 {
                return Err(SessionError::IncompleteTransfer {
                    expected: byte_count,
                    received: byte_count - bytes_remaining,
                });
            }
            file.write_all(&buf[..n]).await.map_err(write_error)?;
            bytes_remaining -= n as u64;
            tracing::trace!("Received {n} bytes, {bytes_remaining} remaining");
        }
        // all announced bytes are in, the peer must now close the connection
        let mut probe = [0u8; 1];
        let n = reader
            .read(&mut probe)
            .await
            .map_err(SessionError::BodyRead)?;
        if n != 0 {
            return Err(SessionError::TrailingData {
                expected: byte_count,
            });
        }
        Ok(())
    }
}
