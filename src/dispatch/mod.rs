//! Payload dispatch
//!
//! Drains a connection's handoff queue on the host's schedule and turns
//! each JSON payload into scene updates through a [`SceneSink`]. The
//! network core stops at delivering text; everything here runs on the
//! consumer side.

pub mod camera;
pub mod custom;
pub mod mesh;
pub mod scene;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{error_chain, DispatchError};
use crate::network::{ErrorState, HandoffQueue};

pub use camera::CameraParams;
pub use custom::TextChangeMonitor;
pub use mesh::{HexColor, LayerInfo, MaterialRef, MeshData, MeshMeta, MeshObject, Uv, Vertex};
pub use scene::{MemoryScene, SceneSink};

/// Longest payload excerpt kept in an error trace
const TRACE_EXCERPT_LEN: usize = 120;

/// Kind of data a connection carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DataType {
    /// Arbitrary text stored under the channel name
    #[default]
    Custom,
    /// Array of mesh packets
    Mesh,
    /// Flat camera parameter object
    Camera,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Custom => "Custom",
            DataType::Mesh => "Mesh",
            DataType::Camera => "Camera",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Custom" => Ok(DataType::Custom),
            "Mesh" => Ok(DataType::Mesh),
            "Camera" => Ok(DataType::Camera),
            other => Err(DispatchError::UnknownDataType(other.to_string())),
        }
    }
}

/// Generic `{"Items": ..., "Meta": {...}}` envelope.
///
/// `Items` is left opaque; envelopes nest, and only the dispatcher knows
/// what a given level holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    #[serde(rename = "Items")]
    pub items: Value,
    #[serde(rename = "Meta")]
    pub meta: Map<String, Value>,
}

impl Packet {
    /// Parse payload text into an envelope
    pub fn parse(text: &str) -> Result<Self, DispatchError> {
        let value: Value = serde_json::from_str(text).map_err(DispatchError::UnsupportedPayload)?;
        Self::from_value(value)
    }

    /// Interpret an already-parsed value as an envelope
    pub fn from_value(value: Value) -> Result<Self, DispatchError> {
        let Value::Object(mut object) = value else {
            return Err(DispatchError::InvalidField {
                field: "Packet",
                reason: "expected a JSON object".into(),
            });
        };

        let items = object.remove("Items").ok_or(DispatchError::MissingField("Items"))?;
        let meta = match object.remove("Meta") {
            Some(Value::Object(meta)) => meta,
            Some(_) => {
                return Err(DispatchError::InvalidField {
                    field: "Meta",
                    reason: "expected an object".into(),
                })
            }
            None => return Err(DispatchError::MissingField("Meta")),
        };

        Ok(Self { items, meta })
    }
}

/// What a single dispatch changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Custom text stored; `changed` is false when identical to the last text
    Text { changed: bool },
    /// Mesh objects replaced for the channel
    Meshes { count: usize },
    Camera,
}

/// Result of draining one queue
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainSummary {
    pub dispatched: usize,
    pub failed: usize,
}

/// Interprets one connection's payloads
#[derive(Debug)]
pub struct PacketDispatcher {
    data_type: DataType,
    channel: String,
    monitor: TextChangeMonitor,
}

impl PacketDispatcher {
    pub fn new(data_type: DataType, channel: impl Into<String>) -> Self {
        Self {
            data_type,
            channel: channel.into(),
            monitor: TextChangeMonitor::new(),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Apply one payload to the sink.
    ///
    /// The payload is fully decoded before the sink is touched, so a
    /// rejected payload leaves the scene unchanged.
    pub fn dispatch<S: SceneSink + ?Sized>(
        &mut self,
        payload: &str,
        sink: &mut S,
    ) -> Result<DispatchOutcome, DispatchError> {
        match self.data_type {
            DataType::Custom => {
                let changed = self.monitor.observe(payload);
                sink.write_text(&self.channel, payload)?;
                Ok(DispatchOutcome::Text { changed })
            }
            DataType::Mesh => {
                let packet = Packet::parse(payload)?;
                let objects = mesh::decode_meshes(&self.channel, &packet)?;
                let count = objects.len();
                sink.replace_meshes(&self.channel, objects)?;
                Ok(DispatchOutcome::Meshes { count })
            }
            DataType::Camera => {
                let camera = CameraParams::parse(payload)?;
                sink.update_camera(&self.channel, camera)?;
                Ok(DispatchOutcome::Camera)
            }
        }
    }

    /// Dispatch everything currently queued, in arrival order.
    ///
    /// Failures are recorded into `errors` and do not stop the drain.
    pub fn drain<S: SceneSink + ?Sized>(
        &mut self,
        queue: &HandoffQueue,
        errors: &ErrorState,
        sink: &mut S,
    ) -> DrainSummary {
        let mut summary = DrainSummary::default();
        for payload in queue.drain() {
            match self.dispatch(&payload, sink) {
                Ok(_) => summary.dispatched += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(channel = %self.channel, "Failed to dispatch {} payload: {}", self.data_type, e);
                    errors.record(
                        format!("Error dispatching {} payload on {}: {e}", self.data_type, self.channel),
                        format!("{}\npayload: {}", error_chain(&e), excerpt(&payload)),
                    );
                }
            }
        }
        summary
    }
}

fn excerpt(payload: &str) -> &str {
    match payload.char_indices().nth(TRACE_EXCERPT_LEN) {
        Some((idx, _)) => &payload[..idx],
        None => payload,
    }
}
