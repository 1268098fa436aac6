//! Datagram header
//!
//! ```text
//! 0        1        2                 4                          8        10
//! +--------+--------+-----------------+--------------------------+--------+-------------
//! | compr. | encr.  | checksum u16 LE | expected_size (i32 LE)   | gap    | payload ...
//! +--------+--------+-----------------+--------------------------+--------+-------------
//! ```
//!
//! The first eight bytes are the packed `bool, bool, u16, i32` record the
//! producers write. The checksum is carried through but not verified. The two
//! gap bytes are opaque. They are written as zero and skipped on read.

use bytes::{Buf, BufMut};

use crate::error::CodecError;

/// Width of the fixed header in bytes
pub const HEADER_LEN: usize = 8;

/// Reserved bytes between the header and the payload
pub const RESERVED_GAP: usize = 2;

/// Offset of the first payload byte within a datagram
pub const PAYLOAD_OFFSET: usize = HEADER_LEN + RESERVED_GAP;

/// Decoded datagram preamble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Declared length of the payload bytes on the wire (never negative)
    pub expected_size: u32,
    /// Producer-supplied checksum, kept as read
    pub checksum: u16,
    /// Payload is gzip-compressed
    pub is_compressed: bool,
    /// Payload is encrypted (recognized, never supported)
    pub is_encrypted: bool,
}

impl PacketHeader {
    /// Header with a zero checksum. `expected_size` must fit in an `i32`.
    pub fn new(expected_size: u32, is_compressed: bool, is_encrypted: bool) -> Self {
        Self {
            expected_size,
            checksum: 0,
            is_compressed,
            is_encrypted,
        }
    }

    pub fn with_checksum(mut self, checksum: u16) -> Self {
        self.checksum = checksum;
        self
    }

    /// Declared payload length
    pub fn expected_size(&self) -> usize {
        self.expected_size as usize
    }

    /// Total datagram length implied by this header
    pub fn datagram_len(&self) -> usize {
        PAYLOAD_OFFSET + self.expected_size()
    }

    /// Write the header followed by the zeroed reserved gap
    pub fn encode<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.is_compressed as u8);
        buf.put_u8(self.is_encrypted as u8);
        buf.put_u16_le(self.checksum);
        // Same bits as the signed field for every size below 2^31
        buf.put_u32_le(self.expected_size);
        buf.put_bytes(0, RESERVED_GAP);
    }

    /// Slice the declared payload out of a full datagram.
    ///
    /// Bytes past the declared payload are ignored.
    pub fn payload<'a>(&self, datagram: &'a [u8]) -> Result<&'a [u8], CodecError> {
        let end = self.datagram_len();
        if datagram.len() < end {
            return Err(CodecError::Truncated {
                declared: self.expected_size(),
                available: datagram.len().saturating_sub(PAYLOAD_OFFSET),
            });
        }
        Ok(&datagram[PAYLOAD_OFFSET..end])
    }
}

/// Decode the fixed-width preamble at the front of a datagram
pub fn parse_header(bytes: &[u8]) -> Result<PacketHeader, CodecError> {
    if bytes.len() < HEADER_LEN {
        return Err(CodecError::HeaderTooShort {
            needed: HEADER_LEN,
            actual: bytes.len(),
        });
    }

    let mut buf = &bytes[..HEADER_LEN];
    let is_compressed = buf.get_u8() != 0;
    let is_encrypted = buf.get_u8() != 0;
    let checksum = buf.get_u16_le();
    let size = buf.get_i32_le();
    let expected_size = u32::try_from(size).map_err(|_| CodecError::NegativeSize(size))?;

    Ok(PacketHeader {
        expected_size,
        checksum,
        is_compressed,
        is_encrypted,
    })
}
