mod action;
mod audio_cues;
mod collision;
mod feed;
mod input;
mod loop_runner;
mod metrics;
mod notifier;
mod physics;
mod rendering;
mod resources;
mod scheduler;
mod simulation;
mod viewport;

pub use action::{ActionMachine, ActionState, ExplicitAction};
pub use audio_cues::{AudioClip, AudioCue, AudioCueTracker, CueInputs};
pub use collision::{
    edge_height_at, CollisionResolver, GroundContact, GroundSurface, SurfaceId, DEFAULT_FLOOR_ID,
    DEFAULT_FLOOR_NAME, EDGE_EPSILON,
};
pub use feed::{scene_feed, SceneFeed, SceneSender, SceneSource, SceneUpdate};
pub use input::{InputAction, InputBuffer, InputSnapshot};
pub use loop_runner::{
    run_app, run_app_with_metrics, AppError, HostWiring, LoopConfig, SLOW_FRAME_ENV_VAR,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use notifier::{
    GroundChangeNotifier, LocationSink, LocationSinkError, LocationUpdate, LogLocationSink,
    ThreadedLocationSink,
};
pub use physics::{CharacterBody, Facing, MotionIntegrator, MoveIntent};
pub use rendering::{
    load_background, natural_to_screen_px, rendered_to_screen_px, BackgroundError,
    BackgroundImage, Renderer, SceneView, Viewport,
};
pub use resources::{
    ActionSprites, AudioBank, ResourceHandle, ResourceHandleError, DEFAULT_AUDIO_PATHS,
};
pub use scheduler::{FrameScheduler, StepPlan};
pub use simulation::{BodySnapshot, Simulation, TickOutcome, TickReport};
pub use viewport::{compute_transform, NaturalSize, ViewportMapper, ViewportTransform};
