use std::collections::HashSet;
use std::env;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::geometry::Vec2;
use crate::terrain::TerrainError;

use super::audio_cues::AudioCue;
use super::feed::{scene_feed, SceneFeed, SceneSender, SceneSource, SceneUpdate};
use super::input::{InputAction, InputBuffer};
use super::metrics::MetricsAccumulator;
use super::rendering::{BackgroundImage, Renderer, SceneView};
use super::resources::{ActionSprites, AudioBank};
use super::scheduler::{normalize_non_zero_duration, FrameScheduler};
use super::simulation::{Simulation, TickOutcome};
use super::MetricsHandle;

pub const SLOW_FRAME_ENV_VAR: &str = "POLYWALK_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "polywalk".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to load scene: {0}")]
    Scene(#[from] TerrainError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Everything the host needs besides the window it creates itself.
pub struct HostWiring {
    pub loop_config: LoopConfig,
    pub simulation: Simulation,
    pub scene_source: SceneSource,
    pub audio_bank: AudioBank,
}

pub fn run_app(wiring: HostWiring) -> Result<(), AppError> {
    run_app_with_metrics(wiring, MetricsHandle::default())
}

pub fn run_app_with_metrics(
    wiring: HostWiring,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let HostWiring {
        loop_config: config,
        simulation,
        scene_source,
        audio_bank,
    } = wiring;

    let (scene_sender, feed) = scene_feed();
    scene_source.load(&scene_sender)?;
    let mut host = HostState::new(simulation, audio_bank, scene_source, scene_sender, feed);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let window_for_loop = Arc::clone(&window);
    let mut renderer = Renderer::new(window).map_err(AppError::CreateRenderer)?;
    let initial_size = window_for_loop.inner_size();
    host.simulation
        .set_container_size(initial_size.width, initial_size.height);

    event_loop.set_control_flow(ControlFlow::Poll);

    let mut scheduler = FrameScheduler::new(
        config.target_tps,
        config.max_frame_delta,
        config.max_ticks_per_frame,
    );
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let mut pacer = RenderPacer::new(config.max_render_fps, Instant::now());

    info!(
        target_tps = config.target_tps.max(1),
        max_frame_delta_ms = scheduler.max_frame_delta().as_millis() as u64,
        max_ticks_per_frame = scheduler.max_ticks_per_frame(),
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %pacer.cap_label(),
        "loop_config"
    );

    let mut keyboard = KeyboardCollector::default();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window_for_loop.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        info!(reason = "window_close", "shutdown_requested");
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        host.simulation
                            .set_container_size(new_size.width, new_size.height);
                        if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = window_for_loop.inner_size();
                        host.simulation.set_container_size(size.width, size.height);
                        if let Err(error) = renderer.resize(size.width, size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::Focused(false) => {
                        keyboard.release_all();
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        keyboard.handle_keyboard_input(&event);
                        if keyboard.buffer.take_pressed(InputAction::Quit) {
                            info!(reason = "escape_key", "shutdown_requested");
                            window_target.exit();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        host.handle_host_keys(&mut keyboard.buffer);
                        host.apply_scene_updates();

                        if slow_frame_delay > Duration::ZERO {
                            // Explicit debug perturbation only; this is not the FPS cap.
                            thread::sleep(slow_frame_delay);
                        }

                        let now = Instant::now();
                        let step_plan = scheduler.advance(now);
                        for _ in 0..step_plan.ticks_to_run {
                            let input_snapshot = keyboard.buffer.snapshot_for_tick();
                            let outcome = host.simulation.tick(&input_snapshot);
                            if let TickOutcome::Advanced(report) = &outcome {
                                host.log_audio_cues(&report.audio_cues);
                            }
                            metrics_accumulator.record_tick(&outcome);
                        }

                        if step_plan.dropped_backlog > Duration::ZERO {
                            metrics_accumulator.record_dropped_backlog(step_plan.dropped_backlog);
                            warn!(
                                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                                max_ticks_per_frame = scheduler.max_ticks_per_frame(),
                                "sim_clamp_triggered"
                            );
                        }

                        // The only sleep that paces rendering.
                        let cap_sleep = pacer.sleep_before_present(Instant::now());
                        if cap_sleep > Duration::ZERO {
                            thread::sleep(cap_sleep);
                        }

                        let view = host.scene_view();
                        if let Err(error) = renderer.render(&view) {
                            warn!(error = %error, "renderer_draw_failed");
                            window_target.exit();
                        }
                        pacer.mark_presented(Instant::now());

                        let next_title = host.window_title(&config.window_title);
                        if last_applied_title.as_deref() != Some(next_title.as_str()) {
                            window_for_loop.set_title(&next_title);
                            last_applied_title = Some(next_title);
                        }
                        metrics_accumulator.record_frame(step_plan.frame_dt);

                        if let Some(snapshot) = metrics_accumulator
                            .maybe_snapshot(now, host.simulation.ground_changes())
                        {
                            metrics_handle.publish(snapshot);
                            info!(
                                fps = snapshot.fps,
                                tps = snapshot.tps,
                                frame_time_ms = snapshot.frame_time_ms,
                                worst_frame_ms = snapshot.worst_frame_ms,
                                dropped_backlog_ms = snapshot.dropped_backlog_ms,
                                suspended_ticks = snapshot.suspended_ticks,
                                landings = snapshot.landings,
                                fall_recoveries = snapshot.fall_recoveries,
                                ground_changes = snapshot.ground_changes,
                                polygons = host.simulation.terrain().len(),
                                "loop_metrics"
                            );
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                window_for_loop.request_redraw();
            }
            Event::LoopExiting => {
                info!(ticks = host.simulation.snapshot().tick, "shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Window-independent host state: scene content, toggles and the simulation.
struct HostState {
    simulation: Simulation,
    background: Option<BackgroundImage>,
    sprites: ActionSprites,
    audio_bank: AudioBank,
    scene_source: SceneSource,
    scene_sender: SceneSender,
    feed: SceneFeed,
    show_background: bool,
    show_outlines: bool,
}

impl HostState {
    fn new(
        simulation: Simulation,
        audio_bank: AudioBank,
        scene_source: SceneSource,
        scene_sender: SceneSender,
        feed: SceneFeed,
    ) -> Self {
        Self {
            simulation,
            background: None,
            sprites: ActionSprites::default(),
            audio_bank,
            scene_source,
            scene_sender,
            feed,
            show_background: true,
            show_outlines: true,
        }
    }

    fn handle_host_keys(&mut self, buffer: &mut InputBuffer) {
        if buffer.take_pressed(InputAction::ToggleBackground) {
            self.show_background = !self.show_background;
            info!(show_background = self.show_background, "background_toggled");
        }
        if buffer.take_pressed(InputAction::ToggleOutlines) {
            self.show_outlines = !self.show_outlines;
            info!(show_outlines = self.show_outlines, "outlines_toggled");
        }
        if buffer.take_pressed(InputAction::ReloadTerrain) {
            info!(path = %self.scene_source.manifest_path().display(), "scene_reload_requested");
            if let Err(error) = self.scene_source.load(&self.scene_sender) {
                warn!(error = %error, "scene_reload_failed_keeping_current");
            }
        }
    }

    fn apply_scene_updates(&mut self) {
        for update in self.feed.drain() {
            match update {
                SceneUpdate::Terrain(terrain) => {
                    self.simulation.replace_terrain(terrain);
                }
                SceneUpdate::Background(background) => {
                    self.simulation.set_natural_size(background.natural_size());
                    self.background = Some(background);
                }
                SceneUpdate::Sprites(sprites) => {
                    info!(sprites = sprites.len(), "action_sprites_updated");
                    self.sprites = sprites;
                }
            }
        }
    }

    fn scene_view(&self) -> SceneView<'_> {
        let config = self.simulation.config();
        SceneView {
            transform: self.simulation.transform(),
            background: self.background.as_ref(),
            terrain: self.simulation.terrain(),
            ground: self.simulation.current_surface(),
            body: self.simulation.snapshot(),
            char_size: Vec2::new(config.char_width, config.char_height),
            default_floor_y: self.simulation.default_floor_y(),
            show_background: self.show_background,
            show_outlines: self.show_outlines,
        }
    }

    fn window_title(&self, base: &str) -> String {
        if self.simulation.transform().is_none() {
            return format!("{base} | loading");
        }
        let snapshot = self.simulation.snapshot();
        let sprite = self
            .sprites
            .resolve(snapshot.state)
            .map(|handle| handle.as_str())
            .unwrap_or("-");
        let ground = self
            .simulation
            .current_ground()
            .map(|ground| ground.name.as_str())
            .unwrap_or("air");
        format!("{base} | {} | {sprite} | on {ground}", snapshot.state)
    }

    fn log_audio_cues(&self, cues: &[AudioCue]) {
        for cue in cues {
            match cue {
                AudioCue::Start(clip) | AudioCue::Stop(clip) | AudioCue::OneShot(clip) => {
                    let handle = self
                        .audio_bank
                        .resolve(*clip)
                        .map(|handle| handle.as_str())
                        .unwrap_or("-");
                    debug!(cue = ?cue, resource = handle, "audio_cue");
                }
                AudioCue::Speech { url } => {
                    debug!(url = url.as_str(), "audio_speech_start")
                }
                AudioCue::SpeechStop => debug!("audio_speech_stop"),
            }
        }
    }
}

/// Several physical keys may share an action; it stays held while any of them is.
#[derive(Debug, Default)]
struct KeyboardCollector {
    buffer: InputBuffer,
    held_keys: HashSet<KeyCode>,
}

impl KeyboardCollector {
    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        // OS auto-repeat only re-sends presses; the buffer ignores them.
        let is_pressed = key_event.state == ElementState::Pressed;
        self.handle_physical_key(key_event.physical_key, is_pressed);
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        let PhysicalKey::Code(code) = key else {
            return;
        };
        let Some(action) = input_action_for_key(key) else {
            return;
        };
        if is_pressed {
            self.held_keys.insert(code);
        } else {
            self.held_keys.remove(&code);
        }
        let still_held = self
            .held_keys
            .iter()
            .any(|held| input_action_for_key(PhysicalKey::Code(*held)) == Some(action));
        self.buffer.set(action, still_held);
    }

    fn release_all(&mut self) {
        self.held_keys.clear();
        self.buffer.release_all();
    }
}

fn input_action_for_key(key: PhysicalKey) -> Option<InputAction> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    let action = match code {
        KeyCode::ArrowLeft => InputAction::MoveLeft,
        KeyCode::ArrowRight => InputAction::MoveRight,
        KeyCode::ArrowDown => InputAction::MoveDown,
        KeyCode::ArrowUp | KeyCode::Space => InputAction::Jump,
        KeyCode::KeyS => InputAction::Speak,
        KeyCode::KeyD => InputAction::Dance,
        KeyCode::KeyW => InputAction::Wave,
        KeyCode::Escape => InputAction::Quit,
        KeyCode::F5 => InputAction::ReloadTerrain,
        KeyCode::F2 => InputAction::ToggleBackground,
        KeyCode::F3 => InputAction::ToggleOutlines,
        _ => return None,
    };
    Some(action)
}

/// Optional render FPS cap. A zero cap means uncapped.
#[derive(Debug, Clone, Copy)]
struct RenderPacer {
    cap: Option<u32>,
    frame_target: Option<Duration>,
    last_present: Instant,
}

impl RenderPacer {
    fn new(max_render_fps: Option<u32>, now: Instant) -> Self {
        let cap = max_render_fps.filter(|fps| *fps > 0);
        Self {
            cap,
            frame_target: cap.map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps))),
            last_present: now,
        }
    }

    /// Time left until the next present is due.
    fn sleep_before_present(&self, now: Instant) -> Duration {
        let Some(target) = self.frame_target else {
            return Duration::ZERO;
        };
        target.saturating_sub(now.saturating_duration_since(self.last_present))
    }

    fn mark_presented(&mut self, now: Instant) {
        self.last_present = now;
    }

    fn cap_label(&self) -> String {
        self.cap
            .map_or_else(|| "off".to_string(), |fps| fps.to_string())
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => match value.parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}
