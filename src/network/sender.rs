//! Producer-side UDP sender
//!
//! Frames payload text with [`PacketEncoder`] and sends one datagram per
//! payload. Used by the `sender` binary and by the integration tests.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::codec::PacketEncoder;
use crate::error::{Error, NetworkError};

/// Sends framed payloads to one target
pub struct PacketSender {
    socket: UdpSocket,
    target: SocketAddr,
    encoder: PacketEncoder,
    packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
}

impl PacketSender {
    /// Bind an ephemeral local socket for sending to `target`
    pub fn new(target: SocketAddr, encoder: PacketEncoder) -> Result<Self, NetworkError> {
        let local: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local).map_err(|e| NetworkError::BindFailed {
            addr: local.to_string(),
            source: e,
        })?;

        Ok(Self {
            socket,
            target,
            encoder,
            packets_sent: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
        })
    }

    /// Encode and send one payload
    pub fn send(&self, text: &str) -> Result<usize, Error> {
        let datagram = self.encoder.encode(text)?;
        self.send_raw(&datagram).map_err(Error::from)
    }

    /// Send pre-framed bytes unchanged
    pub fn send_raw(&self, datagram: &[u8]) -> Result<usize, NetworkError> {
        let sent = self
            .socket
            .send_to(datagram, self.target)
            .map_err(NetworkError::SendFailed)?;
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(sent as u64, Ordering::Relaxed);
        Ok(sent)
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn encoder(&self) -> &PacketEncoder {
        &self.encoder
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{parse_header, PAYLOAD_OFFSET};
    use std::time::Duration;

    #[test]
    fn test_send_frames_payload() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let target = receiver.local_addr().unwrap();

        let sender = PacketSender::new(target, PacketEncoder::new()).unwrap();
        let sent = sender.send("Hello, world!").unwrap();
        assert_eq!(sent, PAYLOAD_OFFSET + 13);
        assert_eq!(sender.packets_sent(), 1);

        let mut buf = [0u8; 1500];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        let header = parse_header(&buf[..len]).unwrap();
        assert_eq!(header.payload(&buf[..len]).unwrap(), b"Hello, world!");
    }

    #[test]
    fn test_oversized_payload_not_sent() {
        let sender = PacketSender::new("127.0.0.1:9".parse().unwrap(), PacketEncoder::new()).unwrap();
        let err = sender.send(&"x".repeat(2000)).unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
        assert_eq!(sender.packets_sent(), 0);
    }
}
