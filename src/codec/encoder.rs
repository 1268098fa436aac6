//! Datagram encoder
//!
//! Producer-side framing: header, reserved gap, then the payload bytes,
//! gzip-compressed when enabled.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::compression;
use crate::constants::MAX_DATAGRAM_SIZE;
use crate::error::CodecError;
use crate::protocol::{PacketHeader, PAYLOAD_OFFSET};

/// Frames payload text into datagrams
#[derive(Debug, Clone)]
pub struct PacketEncoder {
    compress: bool,
    max_datagram_size: usize,
}

impl PacketEncoder {
    pub fn new() -> Self {
        Self {
            compress: false,
            max_datagram_size: MAX_DATAGRAM_SIZE,
        }
    }

    /// Enable or disable gzip compression of payloads
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Override the datagram size limit
    pub fn with_max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size;
        self
    }

    pub fn is_compressing(&self) -> bool {
        self.compress
    }

    /// Encode text into a single datagram
    pub fn encode(&self, text: &str) -> Result<Bytes, CodecError> {
        let payload = if self.compress {
            compression::compress(text.as_bytes())?
        } else {
            text.as_bytes().to_vec()
        };

        let size = PAYLOAD_OFFSET + payload.len();
        if size > self.max_datagram_size {
            return Err(CodecError::PacketTooLarge {
                size,
                limit: self.max_datagram_size,
            });
        }

        let header = PacketHeader::new(payload.len() as u32, self.compress, false);
        let mut buf = BytesMut::with_capacity(size);
        header.encode(&mut buf);
        buf.put_slice(&payload);
        Ok(buf.freeze())
    }
}

impl Default for PacketEncoder {
    fn default() -> Self {
        Self::new()
    }
}
