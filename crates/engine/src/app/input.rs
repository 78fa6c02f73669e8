#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveLeft,
    MoveRight,
    MoveDown,
    Jump,
    Speak,
    Dance,
    Wave,
    Quit,
    ReloadTerrain,
    ToggleBackground,
    ToggleOutlines,
}

const ACTION_COUNT: usize = 11;

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::MoveDown,
        InputAction::Jump,
        InputAction::Speak,
        InputAction::Dance,
        InputAction::Wave,
        InputAction::Quit,
        InputAction::ReloadTerrain,
        InputAction::ToggleBackground,
        InputAction::ToggleOutlines,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveLeft => 0,
            InputAction::MoveRight => 1,
            InputAction::MoveDown => 2,
            InputAction::Jump => 3,
            InputAction::Speak => 4,
            InputAction::Dance => 5,
            InputAction::Wave => 6,
            InputAction::Quit => 7,
            InputAction::ReloadTerrain => 8,
            InputAction::ToggleBackground => 9,
            InputAction::ToggleOutlines => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    fn clear(&mut self) {
        self.down = [false; ACTION_COUNT];
    }
}

/// Input as seen by one simulation tick: held keys plus press/release edges
/// since the previous tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    held: ActionStates,
    pressed: ActionStates,
    released: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.held.is_down(action)
    }

    pub fn pressed(&self, action: InputAction) -> bool {
        self.pressed.is_down(action)
    }

    pub fn released(&self, action: InputAction) -> bool {
        self.released.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.held.set(action, is_down);
        self
    }

    /// Marks a fresh press: held and pressed this tick.
    pub fn with_pressed(mut self, action: InputAction) -> Self {
        self.held.set(action, true);
        self.pressed.set(action, true);
        self
    }

    /// Marks a release: no longer held, released this tick.
    pub fn with_released(mut self, action: InputAction) -> Self {
        self.held.set(action, false);
        self.released.set(action, true);
        self
    }
}

/// Flat buffer for asynchronously delivered key events, sampled once per tick.
#[derive(Debug, Clone, Default)]
pub struct InputBuffer {
    held: ActionStates,
    pressed: ActionStates,
    released: ActionStates,
}

impl InputBuffer {
    pub fn set(&mut self, action: InputAction, is_down: bool) {
        let was_down = self.held.is_down(action);
        if is_down && !was_down {
            self.pressed.set(action, true);
        } else if !is_down && was_down {
            self.released.set(action, true);
        }
        self.held.set(action, is_down);
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.held.is_down(action)
    }

    /// Consumes a press edge outside the tick stream (host-level toggles).
    pub fn take_pressed(&mut self, action: InputAction) -> bool {
        let was_pressed = self.pressed.is_down(action);
        self.pressed.set(action, false);
        was_pressed
    }

    pub fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot {
            held: self.held,
            pressed: self.pressed,
            released: self.released,
        };
        self.pressed.clear();
        self.released.clear();
        snapshot
    }

    /// Drops every held key, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        for action in InputAction::ALL {
            self.set(action, false);
        }
    }
}
