//! gzip payload compression
//!
//! Producers compress with gzip, so this must stay byte-compatible with
//! RFC 1952 streams rather than raw deflate or zlib.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::CodecError;

/// Compress bytes into a single gzip member
pub fn compress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 32), Compression::default());
    encoder.write_all(data).map_err(CodecError::Compression)?;
    encoder.finish().map_err(CodecError::Compression)
}

/// Decompress a gzip stream
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = GzDecoder::new(data);
    // Payloads come from a single datagram, so a few KB covers the common case
    let mut out = Vec::with_capacity(data.len() * 4);
    decoder
        .read_to_end(&mut out)
        .map_err(CodecError::Decompression)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_compress_repetitive_text_shrinks() {
        let text = r#"{"Items":[0,0,0],"Meta":{}}"#.repeat(40);
        let compressed = compress(text.as_bytes()).unwrap();
        assert!(compressed.len() < text.len());
        // gzip magic
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
        assert_eq!(decompress(&compressed).unwrap(), text.as_bytes());
    }

    #[test]
    fn test_decompress_garbage_fails() {
        let err = decompress(b"definitely not gzip").unwrap_err();
        assert!(matches!(err, CodecError::Decompression(_)));
    }

    #[test]
    fn test_decompress_truncated_stream_fails() {
        let compressed = compress(b"Hello, world! Hello, world!").unwrap();
        let cut = &compressed[..compressed.len() - 6];
        assert!(decompress(cut).is_err());
    }

    proptest! {
        #[test]
        fn prop_decompress_inverts_compress(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let compressed = compress(&data).unwrap();
            prop_assert_eq!(decompress(&compressed).unwrap(), data);
        }
    }
}
