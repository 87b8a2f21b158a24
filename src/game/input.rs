use serde::{Deserialize, Serialize};

/// Current input snapshot as reported by the input source.
///
/// Keys are held-state booleans. `pointer_delta` is raw motion since the last
/// frame and `pointer_pressed` is a button-down event for this frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub run: bool,
    pub jump: bool,
    pub crouch: bool,
    pub dance: bool,
    pub roll: bool,
    /// Combat stance toggle key
    pub combat: bool,
    /// Orbit-follow camera mode (pointer motion orbits instead of turning)
    pub orbit: bool,
    pub pointer_delta: [f32; 2],
    pub pointer_pressed: bool,
}

impl InputState {
    /// True when any directional key is held
    pub fn has_direction(&self) -> bool {
        self.forward || self.backward || self.left || self.right
    }

    /// Only the backward key contributes to movement
    pub fn backward_only(&self) -> bool {
        self.backward && !self.forward && !self.left && !self.right
    }
}

/// Keys that went down this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PressedThisFrame {
    pub jump: bool,
    pub roll: bool,
    pub dance: bool,
    pub combat: bool,
    pub attack: bool,
}

/// Edge detector over held keys. The input source only reports held state,
/// so "just pressed" is derived here by comparing against the last frame.
#[derive(Debug, Clone, Default)]
pub struct InputEdges {
    previous: InputState,
}

impl InputEdges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detect(&mut self, current: &InputState) -> PressedThisFrame {
        let prev = &self.previous;
        let pressed = PressedThisFrame {
            jump: current.jump && !prev.jump,
            roll: current.roll && !prev.roll,
            dance: current.dance && !prev.dance,
            combat: current.combat && !prev.combat,
            attack: current.pointer_pressed,
        };
        self.previous = *current;
        pressed
    }
}
