//! Camera payloads
//!
//! A camera payload is a flat JSON object of parameters. The keys are
//! producer-defined, so they are kept as-is with typed accessors.

use serde_json::{Map, Value};

use crate::error::DispatchError;

/// Camera parameters from one payload
#[derive(Debug, Clone, PartialEq)]
pub struct CameraParams(Map<String, Value>);

impl CameraParams {
    /// Parse payload text; it must be a non-empty object
    pub fn parse(text: &str) -> Result<Self, DispatchError> {
        let value: Value = serde_json::from_str(text).map_err(DispatchError::UnsupportedPayload)?;
        match value {
            Value::Object(map) if map.is_empty() => Err(DispatchError::EmptyCamera),
            Value::Object(map) => Ok(Self(map)),
            _ => Err(DispatchError::InvalidField {
                field: "Camera",
                reason: "expected a JSON object".into(),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// A three-component vector such as `Position` or `LookDirection`.
    ///
    /// Producers send `{"X", "Y", "Z"}` objects; `[x, y, z]` arrays are
    /// accepted as well.
    pub fn vector3(&self, key: &str) -> Option<[f64; 3]> {
        match self.0.get(key)? {
            Value::Object(v) => Some([
                v.get("X")?.as_f64()?,
                v.get("Y")?.as_f64()?,
                v.get("Z")?.as_f64()?,
            ]),
            Value::Array(items) => match items.as_slice() {
                [x, y, z] => Some([x.as_f64()?, y.as_f64()?, z.as_f64()?]),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_camera() {
        let camera = CameraParams::parse(
            r#"{"Type":"Perspective","Position":{"X":1,"Y":2,"Z":3.5},"Location":[4,5,6],"Target":[0,0],"Up":{"X":0,"Y":1},"Lens":50}"#,
        )
        .unwrap();
        assert_eq!(camera.text("Type"), Some("Perspective"));
        assert_eq!(camera.vector3("Position"), Some([1.0, 2.0, 3.5]));
        assert_eq!(camera.vector3("Location"), Some([4.0, 5.0, 6.0]));
        assert_eq!(camera.vector3("Target"), None);
        assert_eq!(camera.vector3("Up"), None);
        assert_eq!(camera.number("Lens"), Some(50.0));
        assert_eq!(camera.keys().count(), 6);
    }

    #[test]
    fn test_empty_camera_rejected() {
        assert!(matches!(CameraParams::parse("{}"), Err(DispatchError::EmptyCamera)));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            CameraParams::parse("[1,2,3]"),
            Err(DispatchError::InvalidField { field: "Camera", .. })
        ));
        assert!(matches!(
            CameraParams::parse("{not json"),
            Err(DispatchError::UnsupportedPayload(_))
        ));
    }
}
