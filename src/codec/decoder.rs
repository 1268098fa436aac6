//! Datagram decoder
//!
//! Parses the header, slices out the payload, inflates it when flagged and
//! returns UTF-8 text ready for the handoff queue.

use crate::codec::compression;
use crate::error::CodecError;
use crate::protocol::{parse_header, PacketHeader};

/// Receive-side codec with running statistics
#[derive(Debug, Default)]
pub struct PacketDecoder {
    /// Datagrams decoded into text
    datagrams_decoded: u64,
    /// Of those, how many were compressed
    compressed_decoded: u64,
    /// Datagrams rejected
    datagrams_rejected: u64,
    /// Text bytes produced
    bytes_produced: u64,
}

impl PacketDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one datagram into payload text
    pub fn decode(&mut self, datagram: &[u8]) -> Result<String, CodecError> {
        match Self::decode_datagram(datagram) {
            Ok((header, text)) => {
                self.datagrams_decoded += 1;
                if header.is_compressed {
                    self.compressed_decoded += 1;
                }
                self.bytes_produced += text.len() as u64;
                Ok(text)
            }
            Err(e) => {
                self.datagrams_rejected += 1;
                Err(e)
            }
        }
    }

    fn decode_datagram(datagram: &[u8]) -> Result<(PacketHeader, String), CodecError> {
        let header = parse_header(datagram)?;
        let payload = header.payload(datagram)?;

        // Encrypted payloads must never be treated as plaintext
        if header.is_encrypted {
            return Err(CodecError::EncryptionUnsupported);
        }

        let bytes = if header.is_compressed {
            compression::decompress(payload)?
        } else {
            payload.to_vec()
        };

        let text = String::from_utf8(bytes)?;
        Ok((header, text))
    }

    /// Get statistics
    pub fn stats(&self) -> DecoderStats {
        DecoderStats {
            datagrams_decoded: self.datagrams_decoded,
            compressed_decoded: self.compressed_decoded,
            datagrams_rejected: self.datagrams_rejected,
            bytes_produced: self.bytes_produced,
        }
    }

    /// Reset statistics
    pub fn reset_stats(&mut self) {
        *self = Self::default();
    }
}

/// Decoder statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderStats {
    pub datagrams_decoded: u64,
    pub compressed_decoded: u64,
    pub datagrams_rejected: u64,
    pub bytes_produced: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PacketEncoder;
    use crate::protocol::PAYLOAD_OFFSET;

    #[test]
    fn test_decode_plain_datagram() {
        let mut datagram = vec![0u8, 0, 0, 0, 13, 0, 0, 0, 0, 0];
        datagram.extend_from_slice(b"Hello, world!");

        let mut decoder = PacketDecoder::new();
        assert_eq!(decoder.decode(&datagram).unwrap(), "Hello, world!");
        assert_eq!(decoder.stats().datagrams_decoded, 1);
        assert_eq!(decoder.stats().bytes_produced, 13);
    }

    #[test]
    fn test_decode_compressed_datagram() {
        let encoder = PacketEncoder::new().with_compression(true);
        let text = r#"{"Items":"payload","Meta":{"k":"v"}}"#;
        let datagram = encoder.encode(text).unwrap();

        let mut decoder = PacketDecoder::new();
        assert_eq!(decoder.decode(&datagram).unwrap(), text);
        assert_eq!(decoder.stats().compressed_decoded, 1);
    }

    #[test]
    fn test_encrypted_rejected_before_decoding() {
        let mut datagram = vec![0u8, 1, 0, 0, 5, 0, 0, 0, 0, 0];
        datagram.extend_from_slice(b"plain");

        let mut decoder = PacketDecoder::new();
        let err = decoder.decode(&datagram).unwrap_err();
        assert!(matches!(err, CodecError::EncryptionUnsupported));
        assert_eq!(decoder.stats().datagrams_rejected, 1);
        assert_eq!(decoder.stats().datagrams_decoded, 0);
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut datagram = vec![0u8, 0, 0, 0, 2, 0, 0, 0, 0, 0];
        datagram.extend_from_slice(&[0xC3, 0x28]);

        let mut decoder = PacketDecoder::new();
        assert!(matches!(
            decoder.decode(&datagram),
            Err(CodecError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_compressed_flag_with_plain_bytes_fails() {
        let mut datagram = vec![1u8, 0, 0, 0, 4, 0, 0, 0, 0, 0];
        datagram.extend_from_slice(b"text");

        let mut decoder = PacketDecoder::new();
        assert!(matches!(
            decoder.decode(&datagram),
            Err(CodecError::Decompression(_))
        ));
    }

    #[test]
    fn test_negative_size_rejected() {
        let mut datagram = vec![0u8, 0, 0, 0];
        datagram.extend_from_slice(&(-13i32).to_le_bytes());
        datagram.extend_from_slice(&[0, 0]);
        datagram.extend_from_slice(b"Hello, world!");

        let mut decoder = PacketDecoder::new();
        assert!(matches!(
            decoder.decode(&datagram),
            Err(CodecError::NegativeSize(-13))
        ));
        assert_eq!(decoder.stats().datagrams_rejected, 1);
    }

    #[test]
    fn test_reset_stats() {
        let mut decoder = PacketDecoder::new();
        let _ = decoder.decode(&[0u8; PAYLOAD_OFFSET]);
        decoder.reset_stats();
        assert_eq!(decoder.stats().datagrams_decoded, 0);
    }
}
