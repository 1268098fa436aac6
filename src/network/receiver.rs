//! Per-connection UDP server
//!
//! Each [`UdpServerManager`] owns one socket and one background thread.
//! The thread blocks on the socket with a finite read timeout and checks
//! the [`ShutdownToken`] between reads, so [`UdpServerManager::stop_server`]
//! returns within one timeout interval (1 second by default).
//!
//! Nothing crosses the thread boundary as a panic or error return: decoded
//! payloads land on the [`HandoffQueue`](crate::network::HandoffQueue) and
//! failures land in the [`ErrorState`], both polled by the host.

use parking_lot::Mutex;
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::codec::PacketDecoder;
use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::error::{error_chain, CodecError, NetworkError};
use crate::network::error_state::{ErrorRecord, ErrorState};
use crate::network::queue::{create_shared_queue, SharedHandoffQueue};
use crate::network::udp::{bind_address, create_socket};

/// Cooperative cancellation flag shared with the receive thread
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear a previous request
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Receive-side counters
#[derive(Debug, Default)]
pub struct ReceiverStats {
    datagrams_received: AtomicU64,
    bytes_received: AtomicU64,
    payloads_queued: AtomicU64,
    invalid_datagrams: AtomicU64,
    encrypted_rejected: AtomicU64,
    sockets_closed: AtomicU64,
}

impl ReceiverStats {
    pub fn snapshot(&self) -> ReceiverStatsSnapshot {
        ReceiverStatsSnapshot {
            datagrams_received: self.datagrams_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            payloads_queued: self.payloads_queued.load(Ordering::Relaxed),
            invalid_datagrams: self.invalid_datagrams.load(Ordering::Relaxed),
            encrypted_rejected: self.encrypted_rejected.load(Ordering::Relaxed),
            sockets_closed: self.sockets_closed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`ReceiverStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiverStatsSnapshot {
    pub datagrams_received: u64,
    pub bytes_received: u64,
    pub payloads_queued: u64,
    pub invalid_datagrams: u64,
    pub encrypted_rejected: u64,
    pub sockets_closed: u64,
}

/// Socket shared between the receive thread and the manager.
///
/// Whoever takes it out first closes it; later takes see `None`.
#[derive(Debug, Default)]
struct SocketSlot {
    socket: Mutex<Option<Arc<UdpSocket>>>,
}

impl SocketSlot {
    fn install(&self, socket: Arc<UdpSocket>) {
        *self.socket.lock() = Some(socket);
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.lock().as_ref().and_then(|s| s.local_addr().ok())
    }

    fn close(&self, stats: &ReceiverStats) -> bool {
        let closed = self.socket.lock().take().is_some();
        if closed {
            stats.sockets_closed.fetch_add(1, Ordering::Relaxed);
        }
        closed
    }
}

/// Closes the slot when the receive thread leaves, however it leaves
struct SlotGuard<'a> {
    slot: &'a SocketSlot,
    stats: &'a ReceiverStats,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.slot.close(self.stats);
    }
}

/// State moved onto the receive thread
struct ReceiveLoop {
    connection: Arc<Connection>,
    config: ServerConfig,
    queue: SharedHandoffQueue,
    errors: Arc<ErrorState>,
    shutdown: ShutdownToken,
    socket: Arc<SocketSlot>,
    stats: Arc<ReceiverStats>,
}

impl ReceiveLoop {
    fn run(self) {
        let socket = match create_socket(&self.connection, &self.config) {
            Ok(socket) => Arc::new(socket),
            Err(e) => {
                tracing::error!(
                    uuid = %self.connection.uuid,
                    name = %self.connection.name,
                    "Failed to create UDP server: {}",
                    e
                );
                self.errors.record(
                    format!("Error creating or handling UDP server: {e}"),
                    format!(
                        "{}\naddress: {}\nconnection: {} ({})",
                        error_chain(&e),
                        bind_address(&self.connection),
                        self.connection.name,
                        self.connection.uuid
                    ),
                );
                return;
            }
        };

        self.socket.install(socket.clone());
        // Declared after `socket`, so the slot is emptied before the local handle drops
        let _guard = SlotGuard {
            slot: &self.socket,
            stats: &self.stats,
        };

        tracing::debug!(
            addr = ?socket.local_addr().ok(),
            "Receive loop listening for {}",
            self.connection.name
        );
        self.receive_until_shutdown(&socket);
    }

    fn receive_until_shutdown(&self, socket: &UdpSocket) {
        let mut buf = vec![0u8; self.config.max_datagram_size];
        let mut decoder = PacketDecoder::new();

        while !self.shutdown.is_cancelled() {
            match socket.recv_from(&mut buf) {
                Ok((len, peer)) => self.handle_datagram(&mut decoder, &buf[..len], peer),
                // Timeouts are how the loop gets to re-check the shutdown flag
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                    ) => {}
                Err(e) => {
                    let e = NetworkError::ReceiveFailed(e);
                    tracing::warn!(name = %self.connection.name, "UDP receive error: {}", e);
                    self.errors.record(
                        format!("Error handling UDP packet: {e}"),
                        format!("{}\nconnection: {} ({})", error_chain(&e), self.connection.name, self.connection.uuid),
                    );
                }
            }
        }

        let stats = decoder.stats();
        tracing::debug!(
            decoded = stats.datagrams_decoded,
            rejected = stats.datagrams_rejected,
            "Receive loop for {} exiting",
            self.connection.name
        );
    }

    fn handle_datagram(&self, decoder: &mut PacketDecoder, datagram: &[u8], peer: SocketAddr) {
        self.stats.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.stats
            .bytes_received
            .fetch_add(datagram.len() as u64, Ordering::Relaxed);

        match decoder.decode(datagram) {
            Ok(text) => {
                tracing::debug!(%peer, len = text.len(), "Queued payload for {}", self.connection.name);
                self.queue.push(text);
                self.stats.payloads_queued.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.stats.invalid_datagrams.fetch_add(1, Ordering::Relaxed);
                if matches!(e, CodecError::EncryptionUnsupported) {
                    self.stats.encrypted_rejected.fetch_add(1, Ordering::Relaxed);
                }
                tracing::warn!(%peer, name = %self.connection.name, "Dropped datagram: {}", e);
                self.errors.record(
                    format!("Error handling UDP packet: {e}"),
                    format!(
                        "{}\ndatagram: {} bytes from {}\nconnection: {} ({})",
                        error_chain(&e),
                        datagram.len(),
                        peer,
                        self.connection.name,
                        self.connection.uuid
                    ),
                );
            }
        }
    }
}

/// UDP server bound to a single connection
pub struct UdpServerManager {
    connection: Arc<Connection>,
    config: ServerConfig,
    queue: SharedHandoffQueue,
    errors: Arc<ErrorState>,
    shutdown: ShutdownToken,
    socket: Arc<SocketSlot>,
    stats: Arc<ReceiverStats>,
    thread_handle: Option<JoinHandle<()>>,
}

impl UdpServerManager {
    /// Create a server for a resolved connection record. Nothing is bound
    /// until [`start_server`](Self::start_server).
    pub fn new(connection: Arc<Connection>, config: ServerConfig) -> Self {
        Self {
            connection,
            config,
            queue: create_shared_queue(),
            errors: Arc::new(ErrorState::new()),
            shutdown: ShutdownToken::new(),
            socket: Arc::new(SocketSlot::default()),
            stats: Arc::new(ReceiverStats::default()),
            thread_handle: None,
        }
    }

    /// Spawn the receive thread and return immediately.
    ///
    /// Bind failures happen on the thread and are reported through
    /// [`last_error`](Self::last_error). Call only while
    /// [`is_running`](Self::is_running) is false.
    pub fn start_server(&mut self) -> Result<(), NetworkError> {
        if self.is_running() {
            return Err(NetworkError::AlreadyRunning(self.connection.uuid));
        }
        // Reap a thread that already exited on its own
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }

        self.shutdown.reset();

        let receive_loop = ReceiveLoop {
            connection: self.connection.clone(),
            config: self.config.clone(),
            queue: self.queue.clone(),
            errors: self.errors.clone(),
            shutdown: self.shutdown.clone(),
            socket: self.socket.clone(),
            stats: self.stats.clone(),
        };

        let handle = thread::Builder::new()
            .name(format!("udp-{}", self.connection.name))
            .spawn(move || receive_loop.run())
            .map_err(NetworkError::SpawnFailed)?;
        self.thread_handle = Some(handle);

        tracing::info!(
            "UDP server started for connection uuid: {}, name: {}",
            self.connection.uuid,
            self.connection.name
        );
        Ok(())
    }

    /// Request shutdown, wait for the receive thread, then close the socket
    /// if it is still open. Blocks for at most one receive timeout.
    /// Calling it again is a no-op.
    pub fn stop_server(&mut self) {
        self.shutdown.cancel();

        let had_thread = match self.thread_handle.take() {
            Some(handle) => {
                if handle.join().is_err() {
                    tracing::error!("Receive thread for {} panicked", self.connection.name);
                    self.errors.record(
                        "Error creating or handling UDP server: receive thread panicked",
                        format!("connection: {} ({})", self.connection.name, self.connection.uuid),
                    );
                }
                true
            }
            None => false,
        };

        let closed_here = self.socket.close(&self.stats);

        if had_thread || closed_here {
            tracing::info!(
                "UDP server stopped for connection uuid: {}, name: {}",
                self.connection.uuid,
                self.connection.name
            );
        }
    }

    /// True while the receive thread exists and has not exited
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// True once shutdown was requested, possibly before the thread exits
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Queue of decoded payloads for this connection
    pub fn queue(&self) -> &SharedHandoffQueue {
        &self.queue
    }

    /// Shared error state, for consumers that record their own failures
    pub fn error_state(&self) -> &Arc<ErrorState> {
        &self.errors
    }

    /// Most recent failure, if any
    pub fn last_error(&self) -> Option<ErrorRecord> {
        self.errors.last_error()
    }

    /// Remove and return the most recent failure
    pub fn take_error(&self) -> Option<ErrorRecord> {
        self.errors.take()
    }

    /// Most recent failure message
    pub fn error_message(&self) -> Option<String> {
        self.errors.message()
    }

    /// Diagnostic trace of the most recent failure
    pub fn error_trace(&self) -> Option<String> {
        self.errors.trace()
    }

    /// Address the socket is bound to, while it is open
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn stats(&self) -> ReceiverStatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for UdpServerManager {
    fn drop(&mut self) {
        self.stop_server();
    }
}
