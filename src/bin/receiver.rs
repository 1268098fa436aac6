//! Scene Receiver Application
//!
//! Starts one UDP server per configured connection and drains their
//! queues into an in-memory scene on a fixed tick.

use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use scenelink::{
    config::{AppConfig, ConnectionConfig},
    connection::ConnectionRegistry,
    constants::*,
    dispatch::{DataType, MemoryScene, PacketDispatcher},
};

/// Per-connection consumer state
struct ChannelState {
    name: String,
    dispatcher: PacketDispatcher,
    errors_seen: u64,
    exit_reported: bool,
}

impl ChannelState {
    fn new(name: String, dispatcher: PacketDispatcher) -> Self {
        Self {
            name,
            dispatcher,
            errors_seen: 0,
            exit_reported: false,
        }
    }

    /// True once per unexpected thread exit
    fn note_unexpected_exit(&mut self, running: bool, shutdown: bool) -> bool {
        if running || shutdown {
            self.exit_reported = false;
            return false;
        }
        !std::mem::replace(&mut self.exit_reported, true)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let mut config = AppConfig::load_or_default(config_path.as_deref())?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.filter.clone()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting scene receiver");

    if config.connections.is_empty() {
        tracing::info!("No connections configured, listening for custom text on port {}", DEFAULT_UDP_PORT);
        config.connections.push(ConnectionConfig {
            uuid: None,
            name: "portal-data-0".into(),
            port: DEFAULT_UDP_PORT,
            is_external: false,
            data_type: DataType::Custom,
            channel: None,
        });
    }

    let registry = ConnectionRegistry::new(config.server.clone());
    let mut channels: HashMap<Uuid, ChannelState> = HashMap::new();

    for conn_config in &mut config.connections {
        let connection = registry.add(conn_config.connection())?;
        registry.start(connection.uuid)?;
        tracing::info!(
            "{} connection {} on port {} ({})",
            conn_config.data_type,
            connection.name,
            connection.port,
            if connection.is_external { "external" } else { "local" }
        );
        channels.insert(
            connection.uuid,
            ChannelState::new(
                connection.name.clone(),
                PacketDispatcher::new(conn_config.data_type, conn_config.channel()),
            ),
        );
    }

    let mut scene = MemoryScene::new();
    let mut tick = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
    let mut last_stats_time = Instant::now();

    tracing::info!("Waiting for payloads - press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                break;
            }
            _ = tick.tick() => {}
        }

        for (uuid, state) in channels.iter_mut() {
            registry.with_server(*uuid, |server| {
                let summary = state
                    .dispatcher
                    .drain(server.queue(), server.error_state(), &mut scene);
                if summary.dispatched > 0 {
                    tracing::info!(
                        "{}: applied {} payload(s), scene mutations {}",
                        state.name,
                        summary.dispatched,
                        scene.mutation_count()
                    );
                }

                let errors = server.error_state().error_count();
                if errors > state.errors_seen {
                    state.errors_seen = errors;
                    if let Some(record) = server.last_error() {
                        tracing::error!("{}: {}\n{}", state.name, record.message, record.trace);
                    }
                }

                if state.note_unexpected_exit(server.is_running(), server.is_shutdown()) {
                    tracing::warn!("{}: receive thread is no longer running", state.name);
                }
            });
        }

        // Periodic stats
        if last_stats_time.elapsed() >= Duration::from_secs(5) {
            last_stats_time = Instant::now();
            for (uuid, state) in &channels {
                registry.with_server(*uuid, |server| {
                    let stats = server.stats();
                    tracing::info!(
                        "{} stats: {} datagrams, {} bytes, {} queued, {} invalid ({} encrypted)",
                        state.name,
                        stats.datagrams_received,
                        stats.bytes_received,
                        stats.payloads_queued,
                        stats.invalid_datagrams,
                        stats.encrypted_rejected
                    );
                });
            }
        }
    }

    registry.stop_all();
    tracing::info!("All servers stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unexpected_exit_reported_once() {
        let mut state = ChannelState::new("conflict".into(), PacketDispatcher::new(DataType::Custom, "conflict"));
        assert!(!state.note_unexpected_exit(true, false));
        assert!(state.note_unexpected_exit(false, false));
        for _ in 0..100 {
            assert!(!state.note_unexpected_exit(false, false));
        }
        // Requested stop is not an unexpected exit
        assert!(!state.note_unexpected_exit(false, true));
    }
}
