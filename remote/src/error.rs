//! Error kinds for both ends of a transfer.
//!
//! Every [`SendError`] is fatal to the sending process. A [`SessionError`] only ends the receiving
//! session it occurred in; the listener logs it and keeps accepting.

use std::path::PathBuf;

use crate::protocol::HeaderError;

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("failed to open {path:?}")]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid file name for {path:?}")]
    InvalidFileName {
        path: PathBuf,
        #[source]
        source: HeaderError,
    },
    #[error("failed to resolve {host}:{port}")]
    Resolve {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to connect to {host}:{port}")]
    Connect {
        host: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write header")]
    HeaderWrite(#[source] HeaderError),
    #[error("failed to read input buffer")]
    BufferRead(#[source] std::io::Error),
    #[error("failed to write buffer")]
    BufferWrite(#[source] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ListenError {
    #[error("failed to bind {addr}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to read header")]
    HeaderRead(#[source] std::io::Error),
    #[error("wrong header")]
    HeaderMalformed(#[source] HeaderError),
    #[error("refusing to create {0:?}: name must be a plain file name")]
    UnsafeFileName(String),
    #[error("failed to open {path:?}")]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path:?}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read buffer")]
    BodyRead(#[source] std::io::Error),
    #[error("incomplete transfer: expected {expected} bytes, received {received}")]
    IncompleteTransfer { expected: u64, received: u64 },
    #[error("peer sent more than the announced {expected} bytes")]
    TrailingData { expected: u64 },
}
