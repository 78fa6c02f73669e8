use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::Vec2;

pub const TUNING_ENV_VAR: &str = "POLYWALK_TUNING";

pub const DEFAULT_GRAVITY: f32 = 0.5;
pub const DEFAULT_MOVE_SPEED: f32 = 5.0;
pub const DEFAULT_JUMP_FORCE: f32 = -20.0;
pub const DEFAULT_CHAR_WIDTH: f32 = 60.0;
pub const DEFAULT_CHAR_HEIGHT: f32 = 100.0;
pub const DEFAULT_COLLISION_THRESHOLD_UP: f32 = 25.0;
pub const DEFAULT_COLLISION_THRESHOLD_DOWN: f32 = 10.0;
/// Downward nudge applied by a drop-through. Must clear the upward
/// collision window, otherwise the next query re-catches the platform.
pub const DEFAULT_DROP_THROUGH_OFFSET: f32 = 30.0;
pub const DEFAULT_FLOOR_INSET: f32 = 20.0;
pub const DEFAULT_FALL_RECOVERY_MARGIN: f32 = 100.0;
pub const DEFAULT_INITIAL_SPAWN_X: f32 = 100.0;
pub const DEFAULT_RECOVERY_SPAWN: Vec2 = Vec2 { x: 50.0, y: 0.0 };

const _: () = assert!(DEFAULT_DROP_THROUGH_OFFSET > DEFAULT_COLLISION_THRESHOLD_UP);

/// Physics and collision tuning, in rendered pixels per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
    pub gravity: f32,
    pub move_speed: f32,
    pub jump_force: f32,
    pub char_width: f32,
    pub char_height: f32,
    pub collision_threshold_up: f32,
    pub collision_threshold_down: f32,
    pub drop_through_offset: f32,
    pub default_floor_inset: f32,
    pub fall_recovery_margin: f32,
    pub initial_spawn_x: f32,
    pub recovery_spawn_x: f32,
    pub recovery_spawn_y: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            move_speed: DEFAULT_MOVE_SPEED,
            jump_force: DEFAULT_JUMP_FORCE,
            char_width: DEFAULT_CHAR_WIDTH,
            char_height: DEFAULT_CHAR_HEIGHT,
            collision_threshold_up: DEFAULT_COLLISION_THRESHOLD_UP,
            collision_threshold_down: DEFAULT_COLLISION_THRESHOLD_DOWN,
            drop_through_offset: DEFAULT_DROP_THROUGH_OFFSET,
            default_floor_inset: DEFAULT_FLOOR_INSET,
            fall_recovery_margin: DEFAULT_FALL_RECOVERY_MARGIN,
            initial_spawn_x: DEFAULT_INITIAL_SPAWN_X,
            recovery_spawn_x: DEFAULT_RECOVERY_SPAWN.x,
            recovery_spawn_y: DEFAULT_RECOVERY_SPAWN.y,
        }
    }
}

impl SimConfig {
    pub fn recovery_spawn(&self) -> Vec2 {
        Vec2::new(self.recovery_spawn_x, self.recovery_spawn_y)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fields = [
            ("gravity", self.gravity),
            ("move_speed", self.move_speed),
            ("jump_force", self.jump_force),
            ("char_width", self.char_width),
            ("char_height", self.char_height),
            ("collision_threshold_up", self.collision_threshold_up),
            ("collision_threshold_down", self.collision_threshold_down),
            ("drop_through_offset", self.drop_through_offset),
            ("default_floor_inset", self.default_floor_inset),
            ("fall_recovery_margin", self.fall_recovery_margin),
            ("initial_spawn_x", self.initial_spawn_x),
            ("recovery_spawn_x", self.recovery_spawn_x),
            ("recovery_spawn_y", self.recovery_spawn_y),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be finite",
                });
            }
        }

        require(self.gravity > 0.0, "gravity", "must be positive")?;
        require(self.move_speed >= 0.0, "move_speed", "must not be negative")?;
        require(self.jump_force < 0.0, "jump_force", "must be negative (upward)")?;
        require(self.char_width > 0.0, "char_width", "must be positive")?;
        require(self.char_height > 0.0, "char_height", "must be positive")?;
        require(
            self.collision_threshold_up >= 0.0,
            "collision_threshold_up",
            "must not be negative",
        )?;
        require(
            self.collision_threshold_down >= 0.0,
            "collision_threshold_down",
            "must not be negative",
        )?;
        require(
            self.fall_recovery_margin >= 0.0,
            "fall_recovery_margin",
            "must not be negative",
        )?;

        if self.drop_through_offset <= self.collision_threshold_up {
            return Err(ConfigError::DropThroughTooSmall {
                drop_through_offset: self.drop_through_offset,
                collision_threshold_up: self.collision_threshold_up,
            });
        }
        Ok(())
    }
}

fn require(condition: bool, field: &'static str, reason: &'static str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Invalid { field, reason })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read tuning file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse tuning file {path} at '{json_path}': {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid tuning value {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
    #[error(
        "drop_through_offset ({drop_through_offset}) must exceed collision_threshold_up \
({collision_threshold_up}) or dropping through a platform re-lands on it"
    )]
    DropThroughTooSmall {
        drop_through_offset: f32,
        collision_threshold_up: f32,
    },
}

pub fn load_sim_config(path: &Path) -> Result<SimConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_sim_config(&raw, path)
}

pub fn parse_sim_config(text: &str, origin: &Path) -> Result<SimConfig, ConfigError> {
    let deserializer = &mut serde_json::Deserializer::from_str(text);
    let config: SimConfig =
        serde_path_to_error::deserialize(deserializer).map_err(|error| ConfigError::Parse {
            path: origin.to_path_buf(),
            json_path: error.path().to_string(),
            source: error.into_inner(),
        })?;
    config.validate()?;
    Ok(config)
}
