//! Error types for the scene ingestion core

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Binary protocol errors (header parsing, compression, text decoding)
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Header too short: need {needed} bytes, got {actual}")]
    HeaderTooShort { needed: usize, actual: usize },

    #[error("Truncated payload: header declares {declared} bytes, datagram carries {available}")]
    Truncated { declared: usize, available: usize },

    #[error("Negative payload size in header: {0}")]
    NegativeSize(i32),

    #[error("Encrypted data is not supported")]
    EncryptionUnsupported,

    #[error("Decompression failed: {0}")]
    Decompression(#[source] std::io::Error),

    #[error("Compression failed: {0}")]
    Compression(#[source] std::io::Error),

    #[error("Payload is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Packet too large: {size} bytes (limit {limit})")]
    PacketTooLarge { size: usize, limit: usize },
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed on {addr}: {source}")]
    BindFailed {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Socket configuration failed: {0}")]
    SocketConfig(#[source] std::io::Error),

    #[error("Send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    #[error("Receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    #[error("Server already running for connection {0}")]
    AlreadyRunning(uuid::Uuid),

    #[error("Failed to spawn receive thread: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(uuid::Uuid),

    #[error("Connection already registered: {0}")]
    ConnectionExists(uuid::Uuid),
}

/// Errors raised while interpreting payloads at the dispatch boundary
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unsupported payload: {0}")]
    UnsupportedPayload(#[source] serde_json::Error),

    #[error("Unknown data type: {0}")]
    UnknownDataType(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Invalid mesh packet at index {index}: {source}")]
    InvalidMesh {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Camera payload is empty")]
    EmptyCamera,

    #[error("Scene sink rejected update: {0}")]
    Sink(String),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Render an error and its `source()` chain, one cause per line.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_lists_causes() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = NetworkError::BindFailed {
            addr: "127.0.0.1:6000".into(),
            source: io,
        };
        let chain = error_chain(&err);
        assert!(chain.starts_with("Socket bind failed on 127.0.0.1:6000"));
        assert!(chain.contains("caused by: address in use"));
    }

    #[test]
    fn test_subsystem_errors_convert() {
        let err: Error = CodecError::EncryptionUnsupported.into();
        assert!(matches!(err, Error::Codec(CodecError::EncryptionUnsupported)));
        assert_eq!(err.to_string(), "Codec error: Encrypted data is not supported");
    }
}
