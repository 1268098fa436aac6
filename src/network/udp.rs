//! UDP socket setup

use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::NetworkError;

/// Address a connection's socket binds to.
///
/// External connections listen on every interface, others on loopback only.
pub fn bind_address(connection: &Connection) -> SocketAddr {
    let ip = if connection.is_external {
        Ipv4Addr::UNSPECIFIED
    } else {
        Ipv4Addr::LOCALHOST
    };
    SocketAddr::V4(SocketAddrV4::new(ip, connection.port))
}

/// Create and bind the receive socket for a connection.
///
/// The socket blocks with a finite read timeout so the receive loop can
/// observe shutdown requests. Address reuse is left off, so a port held
/// by another socket surfaces as [`NetworkError::BindFailed`].
pub fn create_socket(connection: &Connection, config: &ServerConfig) -> Result<UdpSocket, NetworkError> {
    let addr = bind_address(connection);

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(NetworkError::SocketConfig)?;

    if let Some(size) = config.recv_buffer_size {
        socket
            .set_recv_buffer_size(size)
            .map_err(NetworkError::SocketConfig)?;
    }

    socket.bind(&addr.into()).map_err(|e| NetworkError::BindFailed {
        addr: addr.to_string(),
        source: e,
    })?;

    socket
        .set_read_timeout(Some(config.recv_timeout()))
        .map_err(NetworkError::SocketConfig)?;

    Ok(socket.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address_scope() {
        let local = Connection::new("local", 6000, false);
        let external = Connection::new("external", 6001, true);
        assert_eq!(bind_address(&local), "127.0.0.1:6000".parse().unwrap());
        assert_eq!(bind_address(&external), "0.0.0.0:6001".parse().unwrap());
    }

    #[test]
    fn test_create_socket_sets_timeout() {
        let config = ServerConfig {
            recv_timeout_ms: 30,
            ..Default::default()
        };
        let socket = create_socket(&Connection::new("t", 0, false), &config).unwrap();
        assert_eq!(
            socket.read_timeout().unwrap(),
            Some(std::time::Duration::from_millis(30))
        );
        assert!(socket.local_addr().unwrap().ip().is_loopback());
    }

    #[test]
    fn test_port_conflict_is_bind_failure() {
        let config = ServerConfig::default();
        let first = create_socket(&Connection::new("a", 0, false), &config).unwrap();
        let port = first.local_addr().unwrap().port();

        let err = create_socket(&Connection::new("b", port, false), &config).unwrap_err();
        assert!(matches!(err, NetworkError::BindFailed { .. }));
    }
}
