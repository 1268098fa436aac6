//! Binary protocol codec
//!
//! Turns datagrams into UTF-8 payload text on the receive side and
//! frames text into datagrams on the producer side.

pub mod compression;
pub mod decoder;
pub mod encoder;

pub use compression::{compress, decompress};
pub use decoder::PacketDecoder;
pub use encoder::PacketEncoder;
