//! Static area content and farm records.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::codec::vec3_text;
use crate::error::ContentError;
use crate::types::{MapLimits, PlayerProfile, Vec3};

/// One placed model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacementRecord {
    #[serde(with = "vec3_text", default = "Vec3::zeros")]
    pub position: Vec3,
    #[serde(with = "vec3_text", default = "Vec3::zeros")]
    pub rotation: Vec3,
    #[serde(with = "vec3_text", default = "unit_scale")]
    pub scaling: Vec3,
    pub name_glb: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub animations: Vec<String>,
}

fn unit_scale() -> Vec3 {
    Vec3::new(1.0, 1.0, 1.0)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl PlacementRecord {
    /// Copy moved by `offset`.
    pub fn offset_by(&self, offset: &Vec3) -> Self {
        Self {
            position: self.position + offset,
            ..self.clone()
        }
    }
}

/// Contents of `assets/json/arq_<location>.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AreaDocument {
    #[serde(default)]
    pub arquitectura: Vec<PlacementRecord>,
    /// Playable rectangle of the area, if it defines its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<MapLimits>,
}

impl AreaDocument {
    pub fn from_json(path: &str, json: &str) -> Result<Self, ContentError> {
        serde_json::from_str(json).map_err(|source| ContentError::Json {
            path: path.to_owned(),
            source,
        })
    }
}

/// File path of a location's static content under `root`.
pub fn area_path(root: &Path, location_id: &str) -> PathBuf {
    root.join("json").join(format!("arq_{location_id}.json"))
}

/// Reads and parses a location's static content.
pub fn load_area(root: &Path, location_id: &str) -> Result<AreaDocument, ContentError> {
    let path = area_path(root, location_id);
    let display = path.display().to_string();
    let json = std::fs::read_to_string(&path).map_err(|source| ContentError::Io {
        path: display.clone(),
        source,
    })?;
    AreaDocument::from_json(&display, &json)
}

/// A player's farm and what is built on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FincaRecord {
    pub id: String,
    pub name: String,
    pub user_id: String,
    #[serde(default)]
    pub arquitectura: Vec<PlacementRecord>,
}

impl FincaRecord {
    /// A new, empty farm owned by `owner`.
    pub fn founded(id: impl Into<String>, owner: &PlayerProfile, user_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: format!("Finca de {}", owner.name),
            user_id: user_id.into(),
            arquitectura: Vec::new(),
        }
    }
}

/// Meshes named `collision*` are invisible collision proxies.
pub fn is_collision_proxy(mesh_name: &str) -> bool {
    mesh_name.starts_with("collision")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_string_and_array_vectors() {
        let doc = AreaDocument::from_json(
            "test",
            r#"{ "arquitectura": [
                { "position": "1.5, 0, -3", "rotation": [0, 3.14, 0], "name_glb": "casa1" },
                { "position": [2, 0, 2], "scaling": "2, 2, 2", "name_glb": "arbol", "animations": null }
            ] }"#,
        )
        .unwrap();

        let casa = &doc.arquitectura[0];
        assert_eq!(casa.position, Vec3::new(1.5, 0.0, -3.0));
        assert_eq!(casa.rotation, Vec3::new(0.0, 3.14, 0.0));
        assert_eq!(casa.scaling, Vec3::new(1.0, 1.0, 1.0));
        assert!(casa.animations.is_empty());

        let arbol = &doc.arquitectura[1];
        assert_eq!(arbol.rotation, Vec3::zeros());
        assert_eq!(arbol.scaling, Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(doc.limits, None);
    }

    #[test]
    fn writes_string_vectors() {
        let record = PlacementRecord {
            position: Vec3::new(0.25, -1.0, 7.125),
            rotation: Vec3::zeros(),
            scaling: unit_scale(),
            name_glb: "casa1".to_owned(),
            animations: vec!["idle".to_owned()],
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["position"], "0.25, -1, 7.125");
        assert_eq!(value["scaling"], "1, 1, 1");

        let back: PlacementRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn malformed_vector_is_a_content_error() {
        let err = AreaDocument::from_json(
            "arq_bad.json",
            r#"{ "arquitectura": [ { "position": "1, 2", "name_glb": "x" } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ContentError::Json { .. }));
    }

    #[test]
    fn area_path_follows_asset_layout() {
        let path = area_path(Path::new("assets"), "pijaoQuindio");
        assert_eq!(path, Path::new("assets/json/arq_pijaoQuindio.json"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_area(Path::new("/nonexistent"), "nowhere").unwrap_err();
        assert!(matches!(err, ContentError::Io { .. }));
    }
}
