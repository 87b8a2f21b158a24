//! Explicit precedence between exclusive actions requested in the same frame.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Roll,
    Jump,
    Attack,
    Dance,
}

/// Highest priority first. Only one of these starts per frame.
pub const ACTION_PRIORITY: [Action; 4] = [Action::Roll, Action::Jump, Action::Attack, Action::Dance];

/// Actions that were both pressed this frame and allowed by the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionRequests {
    pub roll: bool,
    pub jump: bool,
    pub attack: bool,
    pub dance: bool,
}

impl ActionRequests {
    pub fn contains(&self, action: Action) -> bool {
        match action {
            Action::Roll => self.roll,
            Action::Jump => self.jump,
            Action::Attack => self.attack,
            Action::Dance => self.dance,
        }
    }

    /// The winning action, if any
    pub fn resolve(&self) -> Option<Action> {
        ACTION_PRIORITY.iter().copied().find(|&action| self.contains(action))
    }
}
