//! Sending side: one file over one connection.

use tokio::io::AsyncReadExt;
use tracing::instrument;

use crate::error::SendError;
use crate::protocol::Header;
use crate::streams::SendStream;

/// Resolves `host:port` and connects to the first address that accepts.
#[instrument]
pub async fn connect(host: &str, port: u16) -> Result<tokio::net::TcpStream, SendError> {
    let addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|source| SendError::Resolve {
            host: host.to_string(),
            port,
            source,
        })?;
    let mut last_error = None;
    for addr in addrs {
        tracing::debug!("Connecting to {addr}");
        match tokio::net::TcpStream::connect(addr).await {
            Ok(stream) => {
                stream
                    .set_nodelay(true)
                    .map_err(|source| SendError::Connect {
                        host: host.to_string(),
                        port,
                        source,
                    })?;
                return Ok(stream);
            }
            Err(error) => {
                tracing::debug!("Connection to {addr} failed: {error}");
                last_error = Some(error);
            }
        }
    }
    Err(match last_error {
        Some(source) => SendError::Connect {
            host: host.to_string(),
            port,
            source,
        },
        None => SendError::Resolve {
            host: host.to_string(),
            port,
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no addresses found for host",
            ),
        },
    })
}

/// An opened source file, ready to be sent.
///
/// The size announced in the header is taken when the file is opened; exactly that many bytes
/// are sent.
#[derive(Debug)]
pub struct TransferSession {
    file: tokio::fs::File,
    header: Header,
    config: common::TransferConfig,
}

impl TransferSession {
    /// Opens `path` and prepares the header from its base name and current size.
    #[instrument(skip(config))]
    pub async fn open(
        path: &std::path::Path,
        config: common::TransferConfig,
    ) -> Result<Self, SendError> {
        let open_error = |source| SendError::OpenFile {
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(open_error)?;
        let metadata = file.metadata().await.map_err(open_error)?;
        if !metadata.is_file() {
            return Err(open_error(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let header = Header::new(file_name, metadata.len()).map_err(|source| {
            SendError::InvalidFileName {
                path: path.to_path_buf(),
                source,
            }
        })?;
        tracing::debug!(
            "Opened {:?}: {} bytes as {:?}",
            path,
            header.byte_count(),
            header.file_name()
        );
        Ok(Self {
            file,
            header,
            config,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Connects to `host:port` and sends the file.
    pub async fn send(self, host: &str, port: u16) -> Result<common::Summary, SendError> {
        let stream = connect(host, port).await?;
        tracing::info!("Connected to {host}:{port}");
        self.send_over(stream).await
    }

    /// Sends the header and then the file contents over an established connection, closing the
    /// write side once the last chunk is out.
    #[instrument(skip(self, stream), fields(file = %self.header.file_name(), size = self.header.byte_count()))]
    pub async fn send_over<W>(self, stream: W) -> Result<common::Summary, SendError>
    where
        W: tokio::io::AsyncWrite + Unpin,
    {
        let Self {
            file,
            header,
            config,
        } = self;
        let mut send_stream = SendStream::new(stream);
        send_stream
            .send_header(&header)
            .await
            .map_err(SendError::HeaderWrite)?;
        let byte_count = header.byte_count();
        // a file that grew after open is cut off at the announced size
        let mut reader = file.take(byte_count);
        let mut buf = vec![0u8; config.chunk_size];
        let mut bytes_sent: u64 = 0;
        loop {
            let n = reader
                .read(&mut buf)
                .await
                .map_err(SendError::BufferRead)?;
            if n == 0 {
                break;
            }
            send_stream
                .send_data(&buf[..n])
                .await
                .map_err(SendError::BufferWrite)?;
            bytes_sent += n as u64;
            tracing::trace!("Sent {n} bytes ({bytes_sent}/{byte_count})");
        }
        if bytes_sent != byte_count {
            return Err(SendError::BufferRead(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("file shrank during transfer: sent {bytes_sent} of {byte_count} bytes"),
            )));
        }
        send_stream.close().await.map_err(SendError::BufferWrite)?;
        tracing::info!("Sent {:?} ({} bytes)", header.file_name(), bytes_sent);
        Ok(common::Summary {
            file_name: header.file_name().to_string(),
            bytes_transferred: bytes_sent,
        })
    }
}
