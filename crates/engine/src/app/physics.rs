use crate::config::SimConfig;
use crate::geometry::Vec2;

use super::action::ActionState;
use super::input::{InputAction, InputSnapshot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MoveIntent {
    #[default]
    None,
    Left,
    Right,
}

impl MoveIntent {
    /// Right wins when both directions are held.
    pub fn from_input(input: &InputSnapshot) -> Self {
        if input.is_down(InputAction::MoveRight) {
            MoveIntent::Right
        } else if input.is_down(InputAction::MoveLeft) {
            MoveIntent::Left
        } else {
            MoveIntent::None
        }
    }

    pub fn is_moving(self) -> bool {
        self != MoveIntent::None
    }
}

/// Character simulation state in rendered space. `position` is the top-left
/// corner of the collision box.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CharacterBody {
    pub(crate) position: Vec2,
    pub(crate) velocity: Vec2,
    pub(crate) facing: Facing,
    pub(crate) on_ground: bool,
    pub(crate) state: ActionState,
}

impl CharacterBody {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn on_ground(&self) -> bool {
        self.on_ground
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    fn settle_at(&mut self, top_y: f32) {
        self.position.y = top_y;
        self.velocity.y = 0.0;
        self.on_ground = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionIntegrator {
    gravity: f32,
    move_speed: f32,
    jump_force: f32,
    drop_through_offset: f32,
    char_width: f32,
    char_height: f32,
    fall_recovery_margin: f32,
    recovery_spawn: Vec2,
}

impl MotionIntegrator {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            gravity: config.gravity,
            move_speed: config.move_speed,
            jump_force: config.jump_force,
            drop_through_offset: config.drop_through_offset,
            char_width: config.char_width,
            char_height: config.char_height,
            fall_recovery_margin: config.fall_recovery_margin,
            recovery_spawn: config.recovery_spawn(),
        }
    }

    /// Applies the jump impulse; a no-op unless grounded.
    pub fn try_jump(&self, body: &mut CharacterBody) -> bool {
        if !body.on_ground {
            return false;
        }
        body.velocity.y = self.jump_force;
        body.on_ground = false;
        true
    }

    /// Nudges a grounded body below the platform's upward catch window.
    pub fn try_drop_through(&self, body: &mut CharacterBody) -> bool {
        if !body.on_ground {
            return false;
        }
        body.position.y += self.drop_through_offset;
        body.on_ground = false;
        true
    }

    pub fn integrate(&self, body: &mut CharacterBody, intent: MoveIntent, rendered_width: f32) {
        body.velocity.x = match intent {
            MoveIntent::Right => self.move_speed,
            MoveIntent::Left => -self.move_speed,
            MoveIntent::None => 0.0,
        };
        match intent {
            MoveIntent::Right => body.facing = Facing::Right,
            MoveIntent::Left => body.facing = Facing::Left,
            MoveIntent::None => {}
        }

        body.velocity.y += self.gravity;
        body.position.x += body.velocity.x;
        body.position.y += body.velocity.y;

        let max_x = (rendered_width - self.char_width).max(0.0);
        if body.position.x < 0.0 {
            body.position.x = 0.0;
        }
        if body.position.x > max_x {
            body.position.x = max_x;
        }
    }

    /// Snaps the box so its feet rest on `ground_y`.
    pub fn land(&self, body: &mut CharacterBody, ground_y: f32) {
        body.settle_at(ground_y - self.char_height);
    }

    /// Teleports a body that fell well past the viewport back to spawn.
    pub fn recover_if_lost(&self, body: &mut CharacterBody, rendered_height: f32) -> bool {
        if body.position.y <= rendered_height + self.fall_recovery_margin {
            return false;
        }
        body.position = self.recovery_spawn;
        body.velocity = Vec2::ZERO;
        body.on_ground = false;
        true
    }
}
