use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::geometry::{BoundingBox, Vec2};

use super::types::{PolygonId, TerrainError, TerrainPolygon, TerrainSet};

const DEFAULT_OBJECT_NAME: &str = "Object";

/// Parsed resource document: background reference, terrain and action sprites.
#[derive(Debug, Clone)]
pub struct SceneManifest {
    pub background_path: Option<PathBuf>,
    pub terrain: TerrainSet,
    pub action_sprite_urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    background_url: Option<String>,
    #[serde(default)]
    detected_objects: Option<Vec<RawDetectedObject>>,
    #[serde(default)]
    action_gif_urls: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawDetectedObject {
    #[serde(default, alias = "id")]
    id_polygon: Option<PolygonId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    polygon: Option<Vec<[f32; 2]>>,
    #[serde(default)]
    bbox: Option<Vec<f32>>,
    #[serde(default, rename = "audioUrl")]
    audio_url: Option<String>,
    #[serde(default, rename = "ttsText")]
    tts_text: Option<String>,
}

pub fn load_scene_manifest(path: &Path) -> Result<SceneManifest, TerrainError> {
    let raw = fs::read_to_string(path).map_err(|source| TerrainError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    parse_scene_manifest(&raw, path, base_dir)
}

pub fn parse_scene_manifest(
    text: &str,
    origin: &Path,
    base_dir: &Path,
) -> Result<SceneManifest, TerrainError> {
    let deserializer = &mut serde_json::Deserializer::from_str(text);
    let raw: RawManifest = serde_path_to_error::deserialize(deserializer).map_err(|error| {
        TerrainError::Parse {
            path: origin.to_path_buf(),
            json_path: error.path().to_string(),
            source: error.into_inner(),
        }
    })?;

    let polygons = raw
        .detected_objects
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .filter_map(|(index, object)| convert_object(index, object))
        .collect::<Vec<_>>();
    let terrain = TerrainSet::new(polygons)?;
    let background_path = raw
        .background_url
        .as_deref()
        .and_then(|url| resolve_background_path(base_dir, url));

    Ok(SceneManifest {
        background_path,
        terrain,
        action_sprite_urls: raw.action_gif_urls.unwrap_or_default(),
    })
}

fn convert_object(index: usize, object: RawDetectedObject) -> Option<TerrainPolygon> {
    let points = object
        .polygon
        .unwrap_or_default()
        .into_iter()
        .map(|[x, y]| Vec2::new(x, y))
        .collect::<Vec<_>>();
    if points.is_empty() {
        debug!(index, "terrain_object_without_points_dropped");
        return None;
    }
    if points.len() < 3 {
        debug!(index, point_count = points.len(), "terrain_object_degenerate");
    }

    let id = match object.id_polygon {
        Some(id) if !id.is_blank() => id,
        _ => PolygonId::Text(format!("poly-{index}")),
    };
    let name = object
        .name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_OBJECT_NAME.to_string());
    let bbox = object
        .bbox
        .as_deref()
        .and_then(BoundingBox::from_slice);

    Some(TerrainPolygon {
        id,
        name,
        points,
        bbox,
        audio_url: object.audio_url.filter(|url| !url.is_empty()),
        tts_text: object.tts_text.filter(|text| !text.is_empty()),
    })
}

fn resolve_background_path(base_dir: &Path, url: &str) -> Option<PathBuf> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        warn!(url = trimmed, "remote background urls are not fetched; skipping");
        return None;
    }
    let candidate = PathBuf::from(trimmed);
    if candidate.is_absolute() {
        Some(candidate)
    } else {
        Some(base_dir.join(candidate))
    }
}
