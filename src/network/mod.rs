//! Network subsystem for UDP payload ingestion

pub mod error_state;
pub mod queue;
pub mod receiver;
pub mod sender;
pub mod udp;

pub use error_state::{ErrorRecord, ErrorState};
pub use queue::{create_shared_queue, HandoffQueue, SharedHandoffQueue};
pub use receiver::{ReceiverStats, ReceiverStatsSnapshot, ShutdownToken, UdpServerManager};
pub use sender::PacketSender;
pub use udp::{bind_address, create_socket};
