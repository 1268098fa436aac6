//! Payload Sender Application
//!
//! Reads a payload from stdin and sends it as a single framed datagram.
//!
//! ```text
//! echo '{"Lens":50}' | sender 127.0.0.1:6000 [--compress]
//! ```

use anyhow::{Context, Result};
use std::io::Read;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scenelink::{
    codec::PacketEncoder,
    constants::{DEFAULT_LOG_FILTER, DEFAULT_UDP_PORT},
    network::PacketSender,
};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut target = format!("127.0.0.1:{DEFAULT_UDP_PORT}");
    let mut compress = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--compress" => compress = true,
            other => target = other.to_string(),
        }
    }
    let target: SocketAddr = target
        .parse()
        .with_context(|| format!("Invalid target address: {target}"))?;

    let mut payload = String::new();
    std::io::stdin()
        .read_to_string(&mut payload)
        .context("Failed to read payload from stdin")?;
    let payload = payload.trim_end_matches(['\r', '\n']);

    let sender = PacketSender::new(target, PacketEncoder::new().with_compression(compress))?;
    let sent = sender.send(payload)?;

    tracing::info!(
        "Sent {} payload bytes as a {} byte datagram to {}{}",
        payload.len(),
        sent,
        target,
        if compress { " (gzip)" } else { "" }
    );
    Ok(())
}
