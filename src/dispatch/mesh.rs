//! Mesh packets
//!
//! A mesh payload is an envelope whose `Items` is an array of nested
//! envelopes, one per object:
//!
//! ```json
//! {"Items": [
//!     {"Items": {"Vertices": [{"X": 0, "Y": 0, "Z": 0}, ...],
//!                "Faces": [[0,1,2], ...],
//!                "UVs": [{"X": 0, "Y": 0}, ...],
//!                "VertexColors": ["#ff0000", ...]},
//!      "Meta": {"Layer": {"FullPath": "site::walls"}, "Material": {"Name": "brick"}}}
//! ], "Meta": {}}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dispatch::Packet;
use crate::error::DispatchError;

/// Vertex position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct Vertex {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vertex {
    pub fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Texture coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct Uv {
    pub x: f64,
    pub y: f64,
}

/// Vertex color sent as `#rrggbb` or `#rrggbbaa`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub rgba: [u8; 4],
}

impl HexColor {
    pub fn parse(text: &str) -> Result<Self, String> {
        let hex = text.strip_prefix('#').unwrap_or(text);
        if !matches!(hex.len(), 6 | 8) || !hex.is_ascii() {
            return Err(format!("invalid hex color {text:?}"));
        }

        let mut rgba = [0, 0, 0, u8::MAX];
        for (i, channel) in rgba.iter_mut().enumerate().take(hex.len() / 2) {
            *channel = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| format!("invalid hex color {text:?}"))?;
        }
        Ok(Self { rgba })
    }

    /// RGBA in 0..=1
    pub fn normalized(&self) -> [f32; 4] {
        self.rgba.map(|c| c as f32 / 255.0)
    }
}

impl TryFrom<String> for HexColor {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.rgba;
        write!(f, "#{r:02x}{g:02x}{b:02x}")?;
        if a != u8::MAX {
            write!(f, "{a:02x}")?;
        }
        Ok(())
    }
}

/// Geometry of one object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    /// Polygons as vertex indices; triangles, quads or n-gons
    pub faces: Vec<Vec<u32>>,
    #[serde(rename = "UVs", default)]
    pub uvs: Vec<Uv>,
    /// One color per vertex, or none
    #[serde(default)]
    pub vertex_colors: Vec<HexColor>,
}

impl MeshData {
    fn validate(&self) -> Result<(), DispatchError> {
        let required = [
            ("Vertices", self.vertices.is_empty()),
            ("Faces", self.faces.is_empty()),
        ];
        for (field, empty) in required {
            if empty {
                return Err(DispatchError::InvalidField {
                    field,
                    reason: "mesh data must include vertices and faces".into(),
                });
            }
        }

        let vertex_count = self.vertices.len();
        if let Some(face) = self
            .faces
            .iter()
            .find(|face| face.len() < 3 || face.iter().any(|&i| i as usize >= vertex_count))
        {
            return Err(DispatchError::InvalidField {
                field: "Faces",
                reason: format!("face {face:?} is degenerate or indexes past {vertex_count} vertices"),
            });
        }
        if !self.uvs.is_empty() && self.uvs.len() != vertex_count {
            return Err(DispatchError::InvalidField {
                field: "UVs",
                reason: format!("{} coordinates for {vertex_count} vertices", self.uvs.len()),
            });
        }
        Ok(())
    }

    /// Colors only apply when there is exactly one per vertex
    fn drop_mismatched_colors(&mut self) -> bool {
        if self.vertex_colors.is_empty() || self.vertex_colors.len() == self.vertices.len() {
            return false;
        }
        self.vertex_colors.clear();
        true
    }

    /// Per-vertex RGBA in 0..=1
    pub fn normalized_colors(&self) -> Vec<[f32; 4]> {
        self.vertex_colors.iter().map(HexColor::normalized).collect()
    }
}

/// Material reference; everything besides the name is passed through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialRef {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// Layer an object belongs to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LayerInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub full_path: Option<String>,
    #[serde(default)]
    pub material: Option<MaterialRef>,
}

/// Per-object metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MeshMeta {
    #[serde(default)]
    pub layer: Option<LayerInfo>,
    #[serde(default)]
    pub material: Option<MaterialRef>,
}

impl MeshMeta {
    /// Explicit material first, then the layer's
    pub fn resolved_material(&self) -> Option<&MaterialRef> {
        self.material
            .as_ref()
            .or_else(|| self.layer.as_ref().and_then(|l| l.material.as_ref()))
    }

    /// `channel` alone, or `channel::FullPath` when the layer has a path
    pub fn layer_path(&self, channel: &str) -> String {
        match self.layer.as_ref().and_then(|l| l.full_path.as_deref()) {
            Some(path) if !path.is_empty() => format!("{channel}::{path}"),
            _ => channel.to_string(),
        }
    }
}

/// A mesh ready to hand to the scene
#[derive(Debug, Clone, PartialEq)]
pub struct MeshObject {
    pub name: String,
    pub layer_path: String,
    pub material: Option<MaterialRef>,
    pub mesh: MeshData,
}

#[derive(Deserialize)]
struct NestedMesh {
    #[serde(rename = "Items")]
    items: MeshData,
    #[serde(rename = "Meta", default)]
    meta: MeshMeta,
}

/// Object name for the `index`-th mesh of a channel
pub fn object_name(index: usize, channel: &str) -> String {
    format!("obj_{index}_{channel}")
}

/// Decode every nested mesh packet of a mesh envelope
pub fn decode_meshes(channel: &str, packet: &Packet) -> Result<Vec<MeshObject>, DispatchError> {
    let Value::Array(items) = &packet.items else {
        return Err(DispatchError::InvalidField {
            field: "Items",
            reason: "expected an array of mesh packets".into(),
        });
    };

    items
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let mut nested = NestedMesh::deserialize(value)
                .map_err(|source| DispatchError::InvalidMesh { index, source })?;
            nested.items.validate()?;
            if nested.items.drop_mismatched_colors() {
                tracing::debug!(
                    "{channel}: mesh {index} color count differs from vertex count, colors ignored"
                );
            }
            Ok(MeshObject {
                name: object_name(index, channel),
                layer_path: nested.meta.layer_path(channel),
                material: nested.meta.resolved_material().cloned(),
                mesh: nested.items,
            })
        })
        .collect()
}
