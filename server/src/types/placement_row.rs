use pueblo_shared::placement::PlacementRecord;
use pueblo_shared::{ParseVec3Error, format_vec3, parse_vec3};

/// One placed model inside a [`crate::schema::Finca`].
///
/// Same text form as the area JSON files: vectors are `"x, y, z"` strings.
#[derive(spacetimedb::SpacetimeType, Debug, Clone, PartialEq)]
pub struct PlacementRow {
    pub position: String,
    pub rotation: String,
    pub scaling: String,
    pub name_glb: String,
    pub animations: Vec<String>,
}

impl PlacementRow {
    /// Parses the vector strings. Fails on the first malformed one.
    pub fn to_record(&self) -> Result<PlacementRecord, ParseVec3Error> {
        Ok(PlacementRecord {
            position: parse_vec3(&self.position)?,
            rotation: parse_vec3(&self.rotation)?,
            scaling: parse_vec3(&self.scaling)?,
            name_glb: self.name_glb.clone(),
            animations: self.animations.clone(),
        })
    }
}

impl From<&PlacementRecord> for PlacementRow {
    fn from(record: &PlacementRecord) -> Self {
        Self {
            position: format_vec3(&record.position),
            rotation: format_vec3(&record.rotation),
            scaling: format_vec3(&record.scaling),
            name_glb: record.name_glb.clone(),
            animations: record.animations.clone(),
        }
    }
}
