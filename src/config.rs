//! Application configuration
//!
//! Loaded from TOML. A missing file yields [`AppConfig::default`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::connection::Connection;
use crate::constants::{DEFAULT_LOG_FILTER, DEFAULT_RECV_TIMEOUT_MS, MAX_DATAGRAM_SIZE};
use crate::dispatch::DataType;
use crate::error::{Error, Result};
use crate::protocol::PAYLOAD_OFFSET;

/// Largest UDP payload over IPv4
const UDP_PAYLOAD_LIMIT: usize = 65_507;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub connections: Vec<ConnectionConfig>,
}

/// Receive-loop settings shared by every connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket read timeout; also the upper bound on shutdown latency
    pub recv_timeout_ms: u64,
    /// Receive buffer length per datagram
    pub max_datagram_size: usize,
    /// Optional SO_RCVBUF override
    pub recv_buffer_size: Option<usize>,
}

impl ServerConfig {
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            recv_timeout_ms: DEFAULT_RECV_TIMEOUT_MS,
            max_datagram_size: MAX_DATAGRAM_SIZE,
            recv_buffer_size: None,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// One connection entry in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub uuid: Option<Uuid>,
    pub name: String,
    pub port: u16,
    #[serde(default)]
    pub is_external: bool,
    #[serde(default)]
    pub data_type: DataType,
    /// Channel used for object naming and custom text; defaults to `name`
    #[serde(default)]
    pub channel: Option<String>,
}

impl ConnectionConfig {
    /// This entry's uuid, generated and stored on first use when unset
    pub fn uuid(&mut self) -> Uuid {
        *self.uuid.get_or_insert_with(Uuid::new_v4)
    }

    /// Build the connection record; repeated calls share one uuid
    pub fn connection(&mut self) -> Connection {
        Connection {
            uuid: self.uuid(),
            name: self.name.clone(),
            port: self.port,
            is_external: self.is_external,
        }
    }

    pub fn channel(&self) -> &str {
        self.channel.as_deref().unwrap_or(&self.name)
    }
}

impl AppConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let mut config: AppConfig = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        config.assign_missing_uuids();
        Ok(config)
    }

    /// Load from a file; a missing file gives the defaults
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load from the explicit path if given, else the platform config dir
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// `<config dir>/scenelink/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "scenelink")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Give every connection without a uuid a fresh one, once
    pub fn assign_missing_uuids(&mut self) {
        for conn in &mut self.connections {
            conn.uuid();
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.recv_timeout_ms == 0 {
            return Err(Error::Config("recv_timeout_ms must be greater than zero".into()));
        }
        if !(PAYLOAD_OFFSET + 1..=UDP_PAYLOAD_LIMIT).contains(&self.server.max_datagram_size) {
            return Err(Error::Config(format!(
                "max_datagram_size must be within {}..={}",
                PAYLOAD_OFFSET + 1,
                UDP_PAYLOAD_LIMIT
            )));
        }

        let mut ports = HashSet::new();
        for conn in &self.connections {
            if conn.name.trim().is_empty() {
                return Err(Error::Config("connection name must not be empty".into()));
            }
            // Port 0 asks the OS for an ephemeral port and never conflicts
            if conn.port != 0 && !ports.insert(conn.port) {
                return Err(Error::Config(format!(
                    "port {} is used by more than one connection",
                    conn.port
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.recv_timeout(), Duration::from_secs(1));
        assert_eq!(config.server.max_datagram_size, 1500);
        assert_eq!(config.logging.filter, "info");
        assert!(config.connections.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_connections() {
        let text = r#"
            [server]
            recv_timeout_ms = 250

            [[connections]]
            name = "mesh-feed"
            port = 6000
            data_type = "Mesh"

            [[connections]]
            uuid = "6f1c2b0e-4a57-4a1e-9d4b-0c3f5f0b1a22"
            name = "notes"
            port = 6001
            is_external = true
            channel = "portal-data-0"
        "#;
        let mut config = AppConfig::from_toml(text).unwrap();
        assert_eq!(config.server.recv_timeout_ms, 250);
        assert_eq!(config.server.max_datagram_size, 1500);

        let mesh = &mut config.connections[0];
        assert_eq!(mesh.data_type, DataType::Mesh);
        assert_eq!(mesh.channel(), "mesh-feed");
        assert!(!mesh.connection().is_external);

        let notes = &mut config.connections[1];
        assert_eq!(notes.data_type, DataType::Custom);
        assert_eq!(notes.channel(), "portal-data-0");
        let conn = notes.connection();
        assert_eq!(conn.uuid.to_string(), "6f1c2b0e-4a57-4a1e-9d4b-0c3f5f0b1a22");
        assert!(conn.is_external);
    }

    #[test]
    fn test_duplicate_ports_rejected() {
        let text = r#"
            [[connections]]
            name = "a"
            port = 6000

            [[connections]]
            name = "b"
            port = 6000
        "#;
        assert!(matches!(AppConfig::from_toml(text), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_data_type_rejected() {
        let text = r#"
            [[connections]]
            name = "a"
            port = 6000
            data_type = "Light"
        "#;
        assert!(AppConfig::from_toml(text).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let text = "[server]\nrecv_timeout_ms = 0\n";
        assert!(matches!(AppConfig::from_toml(text), Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("scenelink-{}.toml", Uuid::new_v4()));
        let config = AppConfig::load(&path).unwrap();
        assert!(config.connections.is_empty());
    }

    #[test]
    fn test_toml_roundtrip_keeps_connections() {
        let mut config = AppConfig::default();
        config.connections.push(ConnectionConfig {
            uuid: None,
            name: "cam".into(),
            port: 7000,
            is_external: false,
            data_type: DataType::Camera,
            channel: None,
        });
        let text = config.to_toml().unwrap();
        let parsed = AppConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.connections[0].data_type, DataType::Camera);
    }

    #[test]
    fn test_connection_uuid_is_stable() {
        let text = r#"
            [[connections]]
            name = "mesh-feed"
            port = 6000
        "#;
        let mut config = AppConfig::from_toml(text).unwrap();
        let assigned = config.connections[0].uuid.unwrap();

        let conn = &mut config.connections[0];
        assert_eq!(conn.connection().uuid, assigned);
        assert_eq!(conn.connection().uuid, conn.connection().uuid);

        // Survives a save and reload
        let reloaded = AppConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(reloaded.connections[0].uuid, Some(assigned));
    }

    #[test]
    fn test_unset_uuid_generated_once() {
        let mut conn = ConnectionConfig {
            uuid: None,
            name: "notes".into(),
            port: 6001,
            is_external: false,
            data_type: DataType::Custom,
            channel: None,
        };
        let first = conn.connection().uuid;
        assert_eq!(conn.uuid, Some(first));
        assert_eq!(conn.connection().uuid, first);
    }
}
