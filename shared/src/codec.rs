//! Text form of vectors at the storage boundary.
//!
//! Stored records carry vectors as `"x, y, z"`. In memory they are always
//! [`Vec3`]. Formatting uses the shortest decimal that reads back to the same
//! `f32`, so a format/parse round trip is bit-exact.

use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::{Deserializer, Serializer};

use crate::error::ParseVec3Error;
use crate::types::Vec3;

pub fn format_vec3(v: &Vec3) -> String {
    format!("{}, {}, {}", v.x, v.y, v.z)
}

pub fn parse_vec3(input: &str) -> Result<Vec3, ParseVec3Error> {
    let parts: Vec<&str> = input.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(ParseVec3Error::ComponentCount {
            input: input.to_owned(),
            found: parts.len(),
        });
    }

    let mut out = [0.0f32; 3];
    for (index, part) in parts.iter().enumerate() {
        out[index] = part
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParseVec3Error::InvalidComponent {
                input: input.to_owned(),
                index,
            })?;
    }
    Ok(Vec3::new(out[0], out[1], out[2]))
}

/// `#[serde(with = "vec3_text")]`: writes `"x, y, z"`, reads either that or `[x, y, z]`.
pub mod vec3_text {
    use super::*;

    pub fn serialize<S: Serializer>(v: &Vec3, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_vec3(v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec3, D::Error> {
        deserializer.deserialize_any(Vec3TextVisitor)
    }
}

struct Vec3TextVisitor;

impl<'de> Visitor<'de> for Vec3TextVisitor {
    type Value = Vec3;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a \"x, y, z\" string or a 3-element array")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Vec3, E> {
        parse_vec3(v).map_err(E::custom)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec3, A::Error> {
        let mut out = [0.0f32; 3];
        for (index, slot) in out.iter_mut().enumerate() {
            *slot = seq
                .next_element::<f32>()?
                .ok_or_else(|| de::Error::invalid_length(index, &self))?;
        }
        if seq.next_element::<de::IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(4, &self));
        }
        Ok(Vec3::new(out[0], out[1], out[2]))
    }
}
