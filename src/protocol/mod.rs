//! Wire protocol definitions
//!
//! Every datagram starts with a fixed-width [`PacketHeader`], followed by
//! a reserved gap and the (optionally compressed) payload.

pub mod header;

pub use header::{parse_header, PacketHeader, HEADER_LEN, PAYLOAD_OFFSET, RESERVED_GAP};
