//! # Scenelink
//!
//! Network ingestion core for streamed scene and asset updates.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ External producer            │  mesh / camera / custom text
//! │  PacketEncoder + PacketSender│
//! └──────────────┬───────────────┘
//!                │ UDP datagrams (≤1500 bytes)
//!                │ [header 8][gap 2][payload, optionally gzip]
//!                ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │ UdpServerManager (network::receiver), one per Connection    │
//! │  ┌────────────────────────────────────────────────────────┐ │
//! │  │ Receive thread                                         │ │
//! │  │  recv_from (1s timeout) → PacketDecoder → UTF-8 text   │ │
//! │  │        │                          │                    │ │
//! │  │        ▼                          ▼                    │ │
//! │  │  HandoffQueue (FIFO)        ErrorState (last error)    │ │
//! │  └────────────────────────────────────────────────────────┘ │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │ drained on host tick         │ polled
//!                ▼                              ▼
//! ┌──────────────────────────────┐   ┌──────────────────────────┐
//! │ PacketDispatcher (dispatch)  │   │ Host status / UI         │
//! │  Custom | Mesh | Camera      │   └──────────────────────────┘
//! │        → SceneSink           │
//! └──────────────────────────────┘
//! ```

pub mod codec;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod network;
pub mod protocol;

pub use error::{Error, Result};

/// Crate-wide constants
pub mod constants {
    /// Maximum datagram size read from the socket
    pub const MAX_DATAGRAM_SIZE: usize = 1500;

    /// Socket read timeout; bounds how long `stop_server` can block
    pub const DEFAULT_RECV_TIMEOUT_MS: u64 = 1000;

    /// Default UDP port for the first connection
    pub const DEFAULT_UDP_PORT: u16 = 6000;

    /// Host tick interval used by the receiver binary
    pub const TICK_INTERVAL_MS: u64 = 50;

    /// Log filter when neither config nor `RUST_LOG` sets one
    pub const DEFAULT_LOG_FILTER: &str = "info";
}
