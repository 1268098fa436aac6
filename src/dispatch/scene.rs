//! Scene sink
//!
//! The host implements [`SceneSink`] over its own object model.
//! [`MemoryScene`] is a self-contained implementation used by the
//! `receiver` binary and tests.

use std::collections::HashMap;

use crate::dispatch::{CameraParams, MeshObject};
use crate::error::DispatchError;

/// Destination for decoded scene updates
pub trait SceneSink {
    /// Store `text` under `name`, replacing any previous content
    fn write_text(&mut self, name: &str, text: &str) -> Result<(), DispatchError>;

    /// Replace every mesh object previously created for `channel`
    fn replace_meshes(&mut self, channel: &str, objects: Vec<MeshObject>) -> Result<(), DispatchError>;

    /// Apply camera parameters for `channel`
    fn update_camera(&mut self, channel: &str, camera: CameraParams) -> Result<(), DispatchError>;
}

/// In-memory scene
#[derive(Debug, Default)]
pub struct MemoryScene {
    texts: HashMap<String, String>,
    meshes: HashMap<String, Vec<MeshObject>>,
    cameras: HashMap<String, CameraParams>,
    mutations: u64,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.texts.get(name).map(String::as_str)
    }

    pub fn meshes(&self, channel: &str) -> &[MeshObject] {
        self.meshes.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Look up a mesh object by its generated name
    pub fn object(&self, name: &str) -> Option<&MeshObject> {
        self.meshes.values().flatten().find(|o| o.name == name)
    }

    pub fn camera(&self, channel: &str) -> Option<&CameraParams> {
        self.cameras.get(channel)
    }

    /// Number of successful updates applied
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }
}

impl SceneSink for MemoryScene {
    fn write_text(&mut self, name: &str, text: &str) -> Result<(), DispatchError> {
        self.texts.insert(name.to_string(), text.to_string());
        self.mutations += 1;
        Ok(())
    }

    fn replace_meshes(&mut self, channel: &str, objects: Vec<MeshObject>) -> Result<(), DispatchError> {
        self.meshes.insert(channel.to_string(), objects);
        self.mutations += 1;
        Ok(())
    }

    fn update_camera(&mut self, channel: &str, camera: CameraParams) -> Result<(), DispatchError> {
        self.cameras.insert(channel.to_string(), camera);
        self.mutations += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{DataType, PacketDispatcher};

    #[test]
    fn test_meshes_replaced_per_channel() {
        let mut scene = MemoryScene::new();
        let mut dispatcher = PacketDispatcher::new(DataType::Mesh, "site");

        let two = r#"{"Items":[
            {"Items":{"Vertices":[{"X":0,"Y":0,"Z":0},{"X":1,"Y":0,"Z":0},{"X":0,"Y":1,"Z":0}],"Faces":[[0,1,2]]},"Meta":{}},
            {"Items":{"Vertices":[{"X":0,"Y":0,"Z":1},{"X":1,"Y":0,"Z":1},{"X":0,"Y":1,"Z":1}],"Faces":[[0,1,2]]},"Meta":{}}
        ],"Meta":{}}"#;
        let one = r#"{"Items":[
            {"Items":{"Vertices":[{"X":0,"Y":0,"Z":0},{"X":1,"Y":0,"Z":0},{"X":0,"Y":1,"Z":0}],"Faces":[[0,1,2]]},"Meta":{"Material":{"Name":"m"}}}
        ],"Meta":{}}"#;

        dispatcher.dispatch(two, &mut scene).unwrap();
        assert_eq!(scene.meshes("site").len(), 2);
        assert!(scene.object("obj_1_site").is_some());

        dispatcher.dispatch(one, &mut scene).unwrap();
        assert_eq!(scene.meshes("site").len(), 1);
        assert!(scene.object("obj_1_site").is_none());
        assert_eq!(
            scene.object("obj_0_site").unwrap().material.as_ref().unwrap().name,
            "m"
        );
        assert_eq!(scene.mutation_count(), 2);
    }

    #[test]
    fn test_empty_camera_is_not_applied() {
        let mut scene = MemoryScene::new();
        let mut dispatcher = PacketDispatcher::new(DataType::Camera, "cam");
        assert!(dispatcher.dispatch("{}", &mut scene).is_err());
        assert!(scene.camera("cam").is_none());
        assert_eq!(scene.mutation_count(), 0);
    }
}
