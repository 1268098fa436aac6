//! Connection records and their registry
//!
//! A [`Connection`] describes one UDP endpoint. The registry owns the
//! records and at most one running [`UdpServerManager`] per record; the
//! manager itself only ever sees a resolved record.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::NetworkError;
use crate::network::receiver::UdpServerManager;

/// Logical UDP endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub uuid: Uuid,
    pub name: String,
    pub port: u16,
    /// Bind on all interfaces instead of loopback only
    pub is_external: bool,
}

impl Connection {
    pub fn new(name: impl Into<String>, port: u16, is_external: bool) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            port,
            is_external,
        }
    }
}

/// A registered connection and its server, if one was created
struct Entry {
    connection: Arc<Connection>,
    server: Option<UdpServerManager>,
}

/// Registry of connection records keyed by uuid
pub struct ConnectionRegistry {
    entries: DashMap<Uuid, Entry>,
    config: ServerConfig,
}

impl ConnectionRegistry {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            entries: DashMap::new(),
            config,
        }
    }

    /// Register a connection record
    pub fn add(&self, connection: Connection) -> Result<Arc<Connection>, NetworkError> {
        let uuid = connection.uuid;
        if self.entries.contains_key(&uuid) {
            return Err(NetworkError::ConnectionExists(uuid));
        }
        let connection = Arc::new(connection);
        self.entries.insert(
            uuid,
            Entry {
                connection: connection.clone(),
                server: None,
            },
        );
        Ok(connection)
    }

    /// Remove a connection, stopping its server first
    pub fn remove(&self, uuid: Uuid) -> Result<Arc<Connection>, NetworkError> {
        let (_, mut entry) = self
            .entries
            .remove(&uuid)
            .ok_or(NetworkError::ConnectionNotFound(uuid))?;
        if let Some(server) = entry.server.as_mut() {
            server.stop_server();
        }
        Ok(entry.connection)
    }

    /// Get a connection record
    pub fn get(&self, uuid: Uuid) -> Option<Arc<Connection>> {
        self.entries.get(&uuid).map(|e| e.connection.clone())
    }

    /// All registered connection records
    pub fn connections(&self) -> Vec<Arc<Connection>> {
        self.entries.iter().map(|e| e.connection.clone()).collect()
    }

    /// Start the server for a connection, creating it on first use
    pub fn start(&self, uuid: Uuid) -> Result<(), NetworkError> {
        let mut entry = self
            .entries
            .get_mut(&uuid)
            .ok_or(NetworkError::ConnectionNotFound(uuid))?;
        let connection = entry.connection.clone();
        let config = self.config.clone();
        entry
            .server
            .get_or_insert_with(|| UdpServerManager::new(connection, config))
            .start_server()
    }

    /// Stop the server for a connection
    pub fn stop(&self, uuid: Uuid) -> Result<(), NetworkError> {
        let mut entry = self
            .entries
            .get_mut(&uuid)
            .ok_or(NetworkError::ConnectionNotFound(uuid))?;
        if let Some(server) = entry.server.as_mut() {
            server.stop_server();
        }
        Ok(())
    }

    /// Stop every server
    pub fn stop_all(&self) {
        for mut entry in self.entries.iter_mut() {
            if let Some(server) = entry.server.as_mut() {
                server.stop_server();
            }
        }
    }

    /// Run `f` against a connection's server, if it has one
    pub fn with_server<R>(&self, uuid: Uuid, f: impl FnOnce(&UdpServerManager) -> R) -> Option<R> {
        self.entries
            .get(&uuid)
            .and_then(|e| e.server.as_ref().map(f))
    }

    /// Uuids of connections whose receive thread is alive
    pub fn running(&self) -> Vec<Uuid> {
        self.entries
            .iter()
            .filter(|e| e.server.as_ref().is_some_and(|s| s.is_running()))
            .map(|e| *e.key())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for ConnectionRegistry {
    fn drop(&mut self) {
        self.stop_all();
    }
}
