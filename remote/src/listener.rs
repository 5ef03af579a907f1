//! Accept loop of the receiving process.

use tracing::{instrument, Instrument};

use crate::error::{ListenError, SessionError};
use crate::receiver::ConnectionSession;

/// Pause after a failed accept so a persistent error (e.g. out of file descriptors) does not
/// turn the loop into a busy spin
pub const ACCEPT_ERROR_BACKOFF: std::time::Duration = std::time::Duration::from_millis(100);

/// Bound acceptor handing every incoming connection to its own [`ConnectionSession`].
#[derive(Debug)]
pub struct Listener {
    listener: tokio::net::TcpListener,
    output_dir: std::path::PathBuf,
    config: common::TransferConfig,
}

impl Listener {
    #[instrument(skip(config))]
    pub async fn bind(
        addr: std::net::SocketAddr,
        output_dir: &std::path::Path,
        config: common::TransferConfig,
    ) -> Result<Self, ListenError> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ListenError::Bind { addr, source })?;
        tracing::info!("Listening on {addr}, writing files to {:?}", output_dir);
        Ok(Self {
            listener,
            output_dir: output_dir.to_path_buf(),
            config,
        })
    }

    /// Binds `port` on all IPv4 interfaces.
    pub async fn bind_port(
        port: u16,
        output_dir: &std::path::Path,
        config: common::TransferConfig,
    ) -> Result<Self, ListenError> {
        let addr = std::net::SocketAddr::from((std::net::Ipv4Addr::UNSPECIFIED, port));
        Self::bind(addr, output_dir, config).await
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections until the process is terminated; never returns.
    ///
    /// Each session runs as its own task; its outcome is logged and never affects the loop.
    pub async fn run(self) -> std::convert::Infallible {
        let mut sessions = tokio::task::JoinSet::new();
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::info!("Accepted connection from {peer}");
                        let session = ConnectionSession::new(stream, &self.output_dir, &self.config);
                        sessions.spawn(
                            async move { (peer, session.run().await) }
                                .instrument(tracing::info_span!("session", %peer)),
                        );
                    }
                    Err(error) => {
                        tracing::warn!("Failed to accept connection: {error}");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    match finished {
                        Ok((peer, outcome)) => log_outcome(peer, outcome),
                        Err(error) => tracing::error!("Session task failed: {error}"),
                    }
                }
            }
        }
    }
}

fn log_outcome(peer: std::net::SocketAddr, outcome: Result<common::Summary, SessionError>) {
    match outcome {
        Ok(summary) => tracing::info!(
            "EOF from {peer}, success: {:?} ({} bytes)",
            summary.file_name,
            summary.bytes_transferred
        ),
        Err(error) => tracing::error!(
            error = &error as &(dyn std::error::Error + 'static),
            "Transfer from {peer} failed: {error}"
        ),
    }
}
