//! Single-file transfer protocol over TCP.
//!
//! A sender writes a `"<name> <size>\n"` header followed by exactly `size` bytes of file content
//! and then closes the connection. A receiver reads the header, creates the named file and copies
//! the payload into it, reporting success only if the full payload arrived before end-of-stream.
//!
//! - [`sender::TransferSession`] drives the sending side
//! - [`listener::Listener`] accepts connections and runs a [`receiver::ConnectionSession`] for each
//! - [`protocol::HeaderCodec`] frames the header on both sides

pub mod error;
pub mod listener;
pub mod protocol;
pub mod receiver;
pub mod sender;
pub mod streams;

pub use error::{ListenError, SendError, SessionError};
pub use listener::Listener;
pub use protocol::{Header, HeaderCodec, HeaderError};
pub use receiver::ConnectionSession;
pub use sender::TransferSession;
