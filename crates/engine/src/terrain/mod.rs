mod fingerprint;
mod loader;
mod types;

pub use loader::{load_scene_manifest, parse_scene_manifest, SceneManifest};
pub use types::{LocationData, PolygonId, TerrainError, TerrainPolygon, TerrainSet};
