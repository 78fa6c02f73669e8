use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::{ConfigError, SimConfig};
use crate::geometry::Vec2;
use crate::terrain::{LocationData, TerrainSet};

use super::action::{ActionMachine, ActionState};
use super::audio_cues::{AudioCue, AudioCueTracker, CueInputs};
use super::collision::{CollisionResolver, SurfaceId};
use super::input::{InputAction, InputSnapshot};
use super::notifier::{GroundChangeNotifier, LocationSink, LocationUpdate};
use super::physics::{CharacterBody, Facing, MotionIntegrator, MoveIntent};
use super::viewport::{NaturalSize, ViewportMapper, ViewportTransform};

/// Read-only copy of the body handed to renderers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySnapshot {
    pub tick: u64,
    pub position: Vec2,
    pub velocity: Vec2,
    pub facing: Facing,
    pub on_ground: bool,
    pub state: ActionState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub jumped: bool,
    pub dropped: bool,
    pub landed: bool,
    pub recovered: bool,
    pub ground_change: Option<LocationUpdate>,
    pub audio_cues: Vec<AudioCue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// No natural size yet, so there is no scale to simulate against.
    Suspended,
    Advanced(TickReport),
}

pub struct Simulation {
    config: SimConfig,
    resolver: CollisionResolver,
    integrator: MotionIntegrator,
    mapper: ViewportMapper,
    terrain: Arc<TerrainSet>,
    body: CharacterBody,
    body_placed: bool,
    actions: ActionMachine,
    notifier: GroundChangeNotifier,
    current_ground: Option<LocationData>,
    audio: AudioCueTracker,
    tick_counter: u64,
}

impl Simulation {
    pub fn new(
        config: SimConfig,
        container_width: u32,
        container_height: u32,
        sink: Box<dyn LocationSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            resolver: CollisionResolver::new(&config),
            integrator: MotionIntegrator::new(&config),
            mapper: ViewportMapper::new(container_width, container_height),
            terrain: Arc::new(TerrainSet::empty()),
            body: CharacterBody::default(),
            body_placed: false,
            actions: ActionMachine::default(),
            notifier: GroundChangeNotifier::new(sink),
            current_ground: None,
            audio: AudioCueTracker::default(),
            tick_counter: 0,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn terrain(&self) -> &Arc<TerrainSet> {
        &self.terrain
    }

    pub fn transform(&self) -> Option<ViewportTransform> {
        self.mapper.transform()
    }

    pub fn natural_size(&self) -> Option<NaturalSize> {
        self.mapper.natural_size()
    }

    pub fn current_ground(&self) -> Option<&LocationData> {
        self.current_ground.as_ref()
    }

    /// Identity of the surface under the feet, as last reported.
    pub fn current_surface(&self) -> Option<&SurfaceId> {
        self.notifier.current()
    }

    pub fn ground_changes(&self) -> u64 {
        self.notifier.change_count()
    }

    pub fn default_floor_y(&self) -> Option<f32> {
        self.transform()
            .map(|transform| self.resolver.default_floor_y(&transform))
    }

    pub fn snapshot(&self) -> BodySnapshot {
        BodySnapshot {
            tick: self.tick_counter,
            position: self.body.position(),
            velocity: self.body.velocity(),
            facing: self.body.facing(),
            on_ground: self.body.on_ground(),
            state: self.body.state(),
        }
    }

    /// Swaps in a new terrain set. Returns false when the content is identical.
    pub fn replace_terrain(&mut self, terrain: TerrainSet) -> bool {
        if terrain.fingerprint() == self.terrain.fingerprint() {
            debug!(
                fingerprint = terrain.fingerprint(),
                "terrain_replace_skipped_identical"
            );
            return false;
        }
        info!(
            polygons = terrain.len(),
            fingerprint = terrain.fingerprint(),
            "terrain_replaced"
        );
        self.terrain = Arc::new(terrain);
        true
    }

    pub fn set_natural_size(&mut self, natural: NaturalSize) {
        if self.mapper.set_natural_size(natural) {
            self.log_transform("natural_size_changed");
        }
        self.place_body_if_needed();
    }

    pub fn set_container_size(&mut self, width: u32, height: u32) {
        if self.mapper.set_container_size(width, height) {
            self.log_transform("container_resized");
        }
        self.place_body_if_needed();
    }

    /// Moves the body to `position` in rendered space, airborne and at rest.
    pub fn place_body(&mut self, position: Vec2) {
        self.body = CharacterBody {
            facing: self.body.facing,
            state: self.body.state,
            ..CharacterBody::at(position)
        };
        self.body_placed = true;
    }

    pub fn tick(&mut self, input: &InputSnapshot) -> TickOutcome {
        let Some(transform) = self.mapper.transform() else {
            return TickOutcome::Suspended;
        };
        self.tick_counter = self.tick_counter.saturating_add(1);
        let was_on_ground = self.body.on_ground;

        self.actions.apply_input_edges(input, self.body.on_ground);
        let jumped = input.pressed(InputAction::Jump) && self.integrator.try_jump(&mut self.body);
        let dropped = input.pressed(InputAction::MoveDown)
            && self.integrator.try_drop_through(&mut self.body);

        let intent = MoveIntent::from_input(input);
        self.integrator
            .integrate(&mut self.body, intent, transform.rendered_width);

        let terrain = Arc::clone(&self.terrain);
        let contact = if self.body.velocity.y >= 0.0 {
            let position = self.body.position;
            self.resolver
                .check_ground(position.x, position.y, &terrain, &transform)
        } else {
            None
        };
        match &contact {
            Some(contact) => self.integrator.land(&mut self.body, contact.ground_y),
            None => self.body.on_ground = false,
        }

        let recovered = self
            .integrator
            .recover_if_lost(&mut self.body, transform.rendered_height);
        if recovered {
            warn!(
                tick = self.tick_counter,
                rendered_height = transform.rendered_height,
                "fall_recovered"
            );
        }
        let contact = if recovered { None } else { contact };
        let landed = !was_on_ground && self.body.on_ground;

        self.body.state = self.actions.resolve(self.body.on_ground, intent.is_moving());

        let next_surface = contact.as_ref().map(|contact| contact.surface.id());
        let ground_change = self.notifier.notify_if_changed(next_surface, || {
            match contact.as_ref() {
                Some(contact) => LocationUpdate::Standing(contact.location_data(&transform)),
                None => LocationUpdate::Airborne,
            }
        });
        match &ground_change {
            Some(LocationUpdate::Standing(location)) => {
                info!(id = %location.id, name = location.name.as_str(), "ground_changed");
                self.current_ground = Some(location.clone());
            }
            Some(LocationUpdate::Airborne) => {
                debug!(tick = self.tick_counter, "ground_left");
                self.current_ground = None;
            }
            None => {}
        }

        let audio_cues = self.audio.update(CueInputs {
            state: self.body.state,
            on_ground: self.body.on_ground,
            jumped,
            landed,
            ground_audio_url: self
                .current_ground
                .as_ref()
                .and_then(|ground| ground.audio_url.as_deref()),
        });

        TickOutcome::Advanced(TickReport {
            tick: self.tick_counter,
            jumped,
            dropped,
            landed,
            recovered,
            ground_change,
            audio_cues,
        })
    }

    fn place_body_if_needed(&mut self) {
        if self.body_placed {
            return;
        }
        let Some(transform) = self.mapper.transform() else {
            return;
        };
        let spawn = Vec2::new(
            self.config.initial_spawn_x,
            transform.rendered_height - self.config.char_height - self.config.default_floor_inset,
        );
        self.place_body(spawn);
        info!(x = spawn.x, y = spawn.y, "body_spawned");
    }

    fn log_transform(&self, reason: &'static str) {
        if let Some(transform) = self.mapper.transform() {
            info!(
                reason,
                scale = transform.scale,
                offset_x = transform.offset_x,
                offset_y = transform.offset_y,
                rendered_width = transform.rendered_width,
                rendered_height = transform.rendered_height,
                "viewport_transform"
            );
        }
    }
}
