use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{BoundingBox, Vec2};

use super::fingerprint::fingerprint_polygons;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PolygonId {
    Int(i64),
    Text(String),
}

impl PolygonId {
    /// Zero and the empty string count as "no id" in supplier payloads.
    pub(crate) fn is_blank(&self) -> bool {
        match self {
            PolygonId::Int(value) => *value == 0,
            PolygonId::Text(value) => value.trim().is_empty(),
        }
    }
}

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolygonId::Int(value) => write!(f, "{value}"),
            PolygonId::Text(value) => f.write_str(value),
        }
    }
}

impl From<i64> for PolygonId {
    fn from(value: i64) -> Self {
        PolygonId::Int(value)
    }
}

impl From<&str> for PolygonId {
    fn from(value: &str) -> Self {
        PolygonId::Text(value.to_string())
    }
}

/// Terrain outline in natural (background image) pixel space.
///
/// The last point connects back to the first. Convexity is not required and
/// degenerate outlines are kept; they simply yield no walkable edges.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainPolygon {
    pub id: PolygonId,
    pub name: String,
    pub points: Vec<Vec2>,
    pub bbox: Option<BoundingBox>,
    pub audio_url: Option<String>,
    pub tts_text: Option<String>,
}

impl TerrainPolygon {
    pub fn new(id: impl Into<PolygonId>, name: impl Into<String>, points: Vec<Vec2>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            points,
            bbox: None,
            audio_url: None,
            tts_text: None,
        }
    }

    pub fn with_bbox(mut self, bbox: BoundingBox) -> Self {
        self.bbox = Some(bbox);
        self
    }

    pub fn with_audio_url(mut self, audio_url: impl Into<String>) -> Self {
        self.audio_url = Some(audio_url.into());
        self
    }

    /// Edges as `(start, end)` pairs, closing the outline.
    pub fn edges(&self) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
        let count = self.points.len();
        (0..count).map(move |index| (self.points[index], self.points[(index + 1) % count]))
    }

    /// Supplied bbox, or one computed from the points.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bbox.or_else(|| BoundingBox::enclosing(&self.points))
    }

    pub fn location_data(&self) -> LocationData {
        LocationData {
            id: self.id.clone(),
            name: self.name.clone(),
            bbox: self.bbox,
            audio_url: self.audio_url.clone(),
            tts_text: self.tts_text.clone(),
        }
    }
}

/// Payload describing where the character stands, as handed to location sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub id: PolygonId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    #[serde(
        default,
        rename = "audioUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub audio_url: Option<String>,
    #[serde(default, rename = "ttsText", skip_serializing_if = "Option::is_none")]
    pub tts_text: Option<String>,
}

/// One analysis session's worth of terrain. Never mutated; swapped whole.
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainSet {
    polygons: Vec<TerrainPolygon>,
    fingerprint: String,
}

impl TerrainSet {
    pub fn new(polygons: Vec<TerrainPolygon>) -> Result<Self, TerrainError> {
        let mut seen = HashSet::with_capacity(polygons.len());
        for polygon in &polygons {
            if !seen.insert(&polygon.id) {
                return Err(TerrainError::DuplicateId {
                    id: polygon.id.clone(),
                });
            }
        }
        let fingerprint = fingerprint_polygons(&polygons);
        Ok(Self {
            polygons,
            fingerprint,
        })
    }

    pub fn empty() -> Self {
        Self {
            polygons: Vec::new(),
            fingerprint: fingerprint_polygons(&[]),
        }
    }

    pub fn polygons(&self) -> &[TerrainPolygon] {
        &self.polygons
    }

    pub fn find(&self, id: &PolygonId) -> Option<&TerrainPolygon> {
        self.polygons.iter().find(|polygon| &polygon.id == id)
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl Default for TerrainSet {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("failed to read scene manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse scene manifest {path} at '{json_path}': {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate polygon id '{id}' in terrain set")]
    DuplicateId { id: PolygonId },
}
