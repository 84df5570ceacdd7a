use crate::module_bindings::{Character, Finca, PlacementRow};
use pueblo_shared::placement::{FincaRecord, PlacementRecord};
use pueblo_shared::presence::PresenceDocument;
use pueblo_shared::{ParseVec3Error, format_vec3, parse_vec3};

/// A `character` row in the form the roster reads. Vectors stay as text and
/// are parsed (or rejected) by the roster.
pub fn presence_document(row: &Character) -> PresenceDocument {
    PresenceDocument {
        id: row.id.clone(),
        name: row.name.clone(),
        email: row.email.clone(),
        position: row.position.clone(),
        rotation: row.rotation.clone(),
        animation: row.animation.clone(),
        place: row.place.clone(),
        service: row.service.clone(),
    }
}

pub fn placement_row(record: &PlacementRecord) -> PlacementRow {
    PlacementRow {
        position: format_vec3(&record.position),
        rotation: format_vec3(&record.rotation),
        scaling: format_vec3(&record.scaling),
        name_glb: record.name_glb.clone(),
        animations: record.animations.clone(),
    }
}

fn placement_record(row: &PlacementRow) -> Result<PlacementRecord, ParseVec3Error> {
    Ok(PlacementRecord {
        position: parse_vec3(&row.position)?,
        rotation: parse_vec3(&row.rotation)?,
        scaling: parse_vec3(&row.scaling)?,
        name_glb: row.name_glb.clone(),
        animations: row.animations.clone(),
    })
}

pub fn finca_record(row: &Finca) -> Result<FincaRecord, ParseVec3Error> {
    Ok(FincaRecord {
        id: row.id.clone(),
        name: row.name.clone(),
        user_id: row.user_id.clone(),
        arquitectura: row
            .arquitectura
            .iter()
            .map(placement_record)
            .collect::<Result<_, _>>()?,
    })
}
