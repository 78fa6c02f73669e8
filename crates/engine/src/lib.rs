pub mod app;
pub mod config;
pub mod geometry;
pub mod terrain;

pub use app::{
    compute_transform, run_app, run_app_with_metrics, ActionSprites, ActionState, AppError,
    AudioBank, AudioClip, AudioCue, BodySnapshot, Facing, GroundChangeNotifier, HostWiring,
    InputAction, InputBuffer, InputSnapshot, LocationSink, LocationSinkError, LocationUpdate,
    LogLocationSink, LoopConfig, LoopMetricsSnapshot, MetricsHandle, NaturalSize, SceneSource,
    Simulation, SurfaceId, ThreadedLocationSink, TickOutcome, TickReport, ViewportTransform,
    SLOW_FRAME_ENV_VAR,
};
pub use config::{load_sim_config, parse_sim_config, ConfigError, SimConfig, TUNING_ENV_VAR};
pub use geometry::{BoundingBox, Vec2};
pub use terrain::{
    load_scene_manifest, parse_scene_manifest, LocationData, PolygonId, SceneManifest,
    TerrainError, TerrainPolygon, TerrainSet,
};
