use std::fmt;

use serde::Serialize;

use super::input::{InputAction, InputSnapshot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    #[default]
    Idle,
    Run,
    Jump,
    Speak,
    Dance,
    Wave,
}

impl ActionState {
    pub const ALL: [ActionState; 6] = [
        ActionState::Idle,
        ActionState::Run,
        ActionState::Jump,
        ActionState::Speak,
        ActionState::Dance,
        ActionState::Wave,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            ActionState::Idle => "idle",
            ActionState::Run => "run",
            ActionState::Jump => "jump",
            ActionState::Speak => "speak",
            ActionState::Dance => "dance",
            ActionState::Wave => "wave",
        }
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Key-driven actions that latch until released on the ground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExplicitAction {
    Speak,
    Dance,
    Wave,
}

impl ExplicitAction {
    /// Evaluation order for simultaneous presses; later entries win.
    const ORDER: [ExplicitAction; 3] = [
        ExplicitAction::Speak,
        ExplicitAction::Dance,
        ExplicitAction::Wave,
    ];

    pub const fn state(self) -> ActionState {
        match self {
            ExplicitAction::Speak => ActionState::Speak,
            ExplicitAction::Dance => ActionState::Dance,
            ExplicitAction::Wave => ActionState::Wave,
        }
    }

    const fn input(self) -> InputAction {
        match self {
            ExplicitAction::Speak => InputAction::Speak,
            ExplicitAction::Dance => InputAction::Dance,
            ExplicitAction::Wave => InputAction::Wave,
        }
    }
}

/// Priority-ordered action selection.
///
/// Airborne forces `Jump`, except that a latched `Speak` keeps speaking
/// through a jump. On the ground a latched explicit action beats movement,
/// movement gives `Run`, and otherwise the character idles. A release that
/// happens mid-air is held back until the first grounded tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionMachine {
    latched: Option<ExplicitAction>,
    release_pending: bool,
}

impl ActionMachine {
    pub fn latched(&self) -> Option<ExplicitAction> {
        self.latched
    }

    pub fn release_pending(&self) -> bool {
        self.release_pending
    }

    pub fn apply_input_edges(&mut self, input: &InputSnapshot, on_ground: bool) {
        for action in ExplicitAction::ORDER {
            if input.pressed(action.input()) {
                self.latched = Some(action);
                self.release_pending = false;
            }
        }
        for action in ExplicitAction::ORDER {
            if !input.released(action.input()) || self.latched != Some(action) {
                continue;
            }
            if on_ground {
                self.latched = None;
                self.release_pending = false;
            } else {
                self.release_pending = true;
            }
        }
    }

    pub fn resolve(&mut self, on_ground: bool, moving: bool) -> ActionState {
        if !on_ground {
            return match self.latched {
                Some(ExplicitAction::Speak) => ActionState::Speak,
                _ => ActionState::Jump,
            };
        }

        if self.release_pending {
            self.latched = None;
            self.release_pending = false;
        }

        match self.latched {
            Some(action) => action.state(),
            None if moving => ActionState::Run,
            None => ActionState::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(action: InputAction) -> InputSnapshot {
        InputSnapshot::empty().with_pressed(action)
    }

    fn release(action: InputAction) -> InputSnapshot {
        InputSnapshot::empty().with_released(action)
    }

    #[test]
    fn grounded_without_input_idles() {
        let mut machine = ActionMachine::default();
        assert_eq!(machine.resolve(true, false), ActionState::Idle);
    }

    #[test]
    fn grounded_movement_runs() {
        let mut machine = ActionMachine::default();
        assert_eq!(machine.resolve(true, true), ActionState::Run);
    }

    #[test]
    fn airborne_forces_jump() {
        let mut machine = ActionMachine::default();
        assert_eq!(machine.resolve(false, true), ActionState::Jump);
        assert_eq!(machine.resolve(false, false), ActionState::Jump);
    }

    #[test]
    fn speak_survives_airborne() {
        let mut machine = ActionMachine::default();
        machine.apply_input_edges(&press(InputAction::Speak), true);
        assert_eq!(machine.resolve(false, false), ActionState::Speak);
    }

    #[test]
    fn dance_and_wave_yield_to_jump_while_airborne_then_return() {
        for (input, state) in [
            (InputAction::Dance, ActionState::Dance),
            (InputAction::Wave, ActionState::Wave),
        ] {
            let mut machine = ActionMachine::default();
            machine.apply_input_edges(&press(input), true);
            assert_eq!(machine.resolve(false, false), ActionState::Jump);
            assert_eq!(machine.resolve(true, false), state);
        }
    }

    #[test]
    fn explicit_action_beats_movement_on_ground() {
        let mut machine = ActionMachine::default();
        machine.apply_input_edges(&press(InputAction::Dance), true);
        assert_eq!(machine.resolve(true, true), ActionState::Dance);
    }

    #[test]
    fn grounded_release_clears_latch() {
        let mut machine = ActionMachine::default();
        machine.apply_input_edges(&press(InputAction::Wave), true);
        machine.apply_input_edges(&release(InputAction::Wave), true);
        assert_eq!(machine.latched(), None);
        assert_eq!(machine.resolve(true, false), ActionState::Idle);
    }

    #[test]
    fn airborne_release_is_deferred_until_landing() {
        let mut machine = ActionMachine::default();
        machine.apply_input_edges(&press(InputAction::Speak), true);
        machine.apply_input_edges(&release(InputAction::Speak), false);

        assert_eq!(machine.latched(), Some(ExplicitAction::Speak));
        assert!(machine.release_pending());
        assert_eq!(machine.resolve(false, false), ActionState::Speak);
        assert_eq!(machine.resolve(true, false), ActionState::Idle);
        assert_eq!(machine.latched(), None);
    }

    #[test]
    fn repress_while_airborne_cancels_pending_release() {
        let mut machine = ActionMachine::default();
        machine.apply_input_edges(&press(InputAction::Dance), true);
        machine.apply_input_edges(&release(InputAction::Dance), false);
        machine.apply_input_edges(&press(InputAction::Dance), false);
        assert!(!machine.release_pending());
        assert_eq!(machine.resolve(true, false), ActionState::Dance);
    }

    #[test]
    fn releasing_a_different_key_keeps_latch() {
        let mut machine = ActionMachine::default();
        machine.apply_input_edges(&press(InputAction::Speak), true);
        machine.apply_input_edges(&press(InputAction::Dance), true);
        machine.apply_input_edges(&release(InputAction::Speak), true);
        assert_eq!(machine.resolve(true, false), ActionState::Dance);
    }

    #[test]
    fn simultaneous_presses_resolve_deterministically() {
        let mut machine = ActionMachine::default();
        let input = InputSnapshot::empty()
            .with_pressed(InputAction::Wave)
            .with_pressed(InputAction::Speak)
            .with_pressed(InputAction::Dance);
        machine.apply_input_edges(&input, true);
        assert_eq!(machine.latched(), Some(ExplicitAction::Wave));
    }

    #[test]
    fn tap_within_one_tick_on_ground_ends_idle() {
        let mut machine = ActionMachine::default();
        let input = InputSnapshot::empty()
            .with_pressed(InputAction::Speak)
            .with_released(InputAction::Speak);
        machine.apply_input_edges(&input, true);
        assert_eq!(machine.resolve(true, false), ActionState::Idle);
    }

    #[test]
    fn state_names_match_resource_keys() {
        let names = ActionState::ALL.map(ActionState::name);
        assert_eq!(names, ["idle", "run", "jump", "speak", "dance", "wave"]);
        assert_eq!(ActionState::Dance.to_string(), "dance");
    }
}
