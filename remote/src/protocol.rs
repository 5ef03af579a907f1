//! Wire format of the transfer header.
//!
//! A transfer starts with a single text record followed directly by the raw file contents:
//!
//! ```text
//! <file_name> <byte_count>\n<byte_count bytes of payload>
//! ```
//!
//! [`HeaderCodec`] frames and parses that record. When the decoder finds the delimiter, any bytes
//! already buffered past it are payload and stay in the caller's buffer.

use bytes::{BufMut, BytesMut};

/// Marks the end of the header
pub const DELIMITER: &[u8] = b"\n";

#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("malformed header: {0}")]
    Malformed(String),
    #[error("no header delimiter found within {max} bytes")]
    TooLong { max: usize },
    #[error("file name {name:?} cannot be sent: {reason}")]
    InvalidName { name: String, reason: &'static str },
}

/// File name and size announced ahead of the payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    file_name: String,
    byte_count: u64,
}

impl Header {
    /// Builds a header, rejecting names the wire format cannot carry.
    pub fn new(file_name: impl Into<String>, byte_count: u64) -> Result<Self, HeaderError> {
        let file_name = file_name.into();
        let reason = if file_name.is_empty() {
            Some("name is empty")
        } else if file_name.chars().any(char::is_whitespace) {
            Some("name contains whitespace")
        } else if contains_delimiter(file_name.as_bytes()) {
            Some("name contains the header delimiter")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(HeaderError::InvalidName {
                name: file_name,
                reason,
            }),
            None => Ok(Self {
                file_name,
                byte_count,
            }),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn byte_count(&self) -> u64 {
        self.byte_count
    }

    /// Appends the wire representation of this header to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        let byte_count = self.byte_count.to_string();
        dst.reserve(self.file_name.len() + 1 + byte_count.len() + DELIMITER.len());
        dst.put_slice(self.file_name.as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(byte_count.as_bytes());
        dst.put_slice(DELIMITER);
    }

    fn parse(line: &[u8]) -> Result<Self, HeaderError> {
        let text = std::str::from_utf8(line)
            .map_err(|_| HeaderError::Malformed("header is not valid UTF-8".to_string()))?;
        let mut tokens = text.split_whitespace();
        let (Some(file_name), Some(size), None) = (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(HeaderError::Malformed(format!(
                "expected \"<name> <size>\", got {text:?}"
            )));
        };
        // u64::from_str would also accept a leading '+'
        if !size.bytes().all(|b| b.is_ascii_digit()) {
            return Err(HeaderError::Malformed(format!("invalid size {size:?}")));
        }
        let byte_count = size
            .parse::<u64>()
            .map_err(|err| HeaderError::Malformed(format!("invalid size {size:?}: {err}")))?;
        Ok(Self {
            file_name: file_name.to_string(),
            byte_count,
        })
    }
}

fn contains_delimiter(bytes: &[u8]) -> bool {
    bytes.windows(DELIMITER.len()).any(|window| window == DELIMITER)
}

/// Frames a single [`Header`] on a byte stream.
///
/// Decoding gives up with [`HeaderError::TooLong`] once `max_len` bytes have been buffered
/// without finding the delimiter.
#[derive(Debug)]
pub struct HeaderCodec {
    max_len: usize,
    // bytes before this index were already searched
    next_index: usize,
}

impl HeaderCodec {
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len,
            next_index: 0,
        }
    }
}

impl Default for HeaderCodec {
    fn default() -> Self {
        Self::new(common::config::DEFAULT_MAX_HEADER_LEN)
    }
}

impl tokio_util::codec::Decoder for HeaderCodec {
    type Item = Header;
    type Error = HeaderError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Header>, HeaderError> {
        let search_end = buf.len().min(self.max_len);
        let found = buf[..search_end]
            .windows(DELIMITER.len())
            .skip(self.next_index)
            .position(|window| window == DELIMITER)
            .map(|offset| self.next_index + offset);
        match found {
            Some(pos) => {
                self.next_index = 0;
                let line = buf.split_to(pos + DELIMITER.len());
                Header::parse(&line[..pos]).map(Some)
            }
            None if buf.len() >= self.max_len => Err(HeaderError::TooLong { max: self.max_len }),
            None => {
                // a partial delimiter may sit at the end of the buffer
                self.next_index = buf.len().saturating_sub(DELIMITER.len() - 1);
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Header>, HeaderError> {
        match self.decode(buf)? {
            Some(header) => Ok(Some(header)),
            None if buf.is_empty() => Ok(None),
            None => Err(HeaderError::Malformed(
                "connection closed before the header delimiter".to_string(),
            )),
        }
    }
}

impl tokio_util::codec::Encoder<Header> for HeaderCodec {
    type Error = HeaderError;

    fn encode(&mut self, header: Header, dst: &mut BytesMut) -> Result<(), HeaderError> {
        header.encode(dst);
        Ok(())
    }
}
