use sha2::{Digest, Sha256};

use crate::geometry::BoundingBox;

use super::types::{PolygonId, TerrainPolygon};

pub(crate) fn fingerprint_polygons(polygons: &[TerrainPolygon]) -> String {
    let mut hasher = Sha256::new();
    hasher.update((polygons.len() as u32).to_le_bytes());
    for polygon in polygons {
        match &polygon.id {
            PolygonId::Int(value) => {
                hasher.update([b'i']);
                hasher.update(value.to_le_bytes());
            }
            PolygonId::Text(value) => {
                hasher.update([b's']);
                hasher.update(value.as_bytes());
            }
        }
        hasher.update([0u8]);
        hasher.update(polygon.name.as_bytes());
        hasher.update([0u8]);
        hasher.update((polygon.points.len() as u32).to_le_bytes());
        for point in &polygon.points {
            hasher.update(point.x.to_le_bytes());
            hasher.update(point.y.to_le_bytes());
        }
        hash_optional_bbox(&mut hasher, polygon.bbox.as_ref());
        hash_optional_text(&mut hasher, polygon.audio_url.as_deref());
        hash_optional_text(&mut hasher, polygon.tts_text.as_deref());
    }
    to_hex_lower(&hasher.finalize())
}

fn hash_optional_text(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(text) => {
            hasher.update([1u8]);
            hasher.update(text.as_bytes());
            hasher.update([0u8]);
        }
        None => hasher.update([0u8]),
    }
}

fn hash_optional_bbox(hasher: &mut Sha256, bbox: Option<&BoundingBox>) {
    match bbox {
        Some(bbox) => {
            hasher.update([1u8]);
            for value in [bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y] {
                hasher.update(value.to_le_bytes());
            }
        }
        None => hasher.update([0u8]),
    }
}

fn to_hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
