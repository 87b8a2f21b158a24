use serde::{Deserialize, Serialize};

/// Logical animation played by the locomotion state machine. Mapped to clip
/// names through the `[animations.clips]` config table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKey {
    Idle,
    Walk,
    Run,
    WalkBackward,
    CrouchIdle,
    CrouchWalk,
    JumpStart,
    JumpLoop,
    JumpLand,
    Roll,
    Dance,
    CombatIdle,
    Attack,
}

impl AnimationKey {
    pub const ALL: [AnimationKey; 13] = [
        AnimationKey::Idle,
        AnimationKey::Walk,
        AnimationKey::Run,
        AnimationKey::WalkBackward,
        AnimationKey::CrouchIdle,
        AnimationKey::CrouchWalk,
        AnimationKey::JumpStart,
        AnimationKey::JumpLoop,
        AnimationKey::JumpLand,
        AnimationKey::Roll,
        AnimationKey::Dance,
        AnimationKey::CombatIdle,
        AnimationKey::Attack,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AnimationKey::Idle => "idle",
            AnimationKey::Walk => "walk",
            AnimationKey::Run => "run",
            AnimationKey::WalkBackward => "walk_backward",
            AnimationKey::CrouchIdle => "crouch_idle",
            AnimationKey::CrouchWalk => "crouch_walk",
            AnimationKey::JumpStart => "jump_start",
            AnimationKey::JumpLoop => "jump_loop",
            AnimationKey::JumpLand => "jump_land",
            AnimationKey::Roll => "roll",
            AnimationKey::Dance => "dance",
            AnimationKey::CombatIdle => "combat_idle",
            AnimationKey::Attack => "attack",
        }
    }

    /// Jump phases and roll switch immediately, ignoring the change cooldown.
    pub fn is_priority(self) -> bool {
        matches!(
            self,
            AnimationKey::JumpStart | AnimationKey::JumpLoop | AnimationKey::JumpLand | AnimationKey::Roll
        )
    }
}

/// Flags the selector reads, captured after the frame's state updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseFlags {
    pub rolling: bool,
    pub jump_start: bool,
    pub jump_loop: bool,
    pub landing: bool,
    pub attacking: bool,
    pub dancing: bool,
    pub crouching: bool,
    pub combat: bool,
    pub moving: bool,
    pub running: bool,
    pub backward_only: bool,
}

/// Picks the animation for the current pose, highest precedence first.
pub fn select(flags: &PoseFlags) -> AnimationKey {
    if flags.rolling {
        AnimationKey::Roll
    } else if flags.jump_start {
        AnimationKey::JumpStart
    } else if flags.jump_loop {
        AnimationKey::JumpLoop
    } else if flags.landing {
        AnimationKey::JumpLand
    } else if flags.attacking {
        AnimationKey::Attack
    } else if flags.dancing {
        AnimationKey::Dance
    } else if flags.crouching {
        if flags.moving {
            AnimationKey::CrouchWalk
        } else {
            AnimationKey::CrouchIdle
        }
    } else if flags.moving {
        if flags.backward_only {
            AnimationKey::WalkBackward
        } else if flags.running {
            AnimationKey::Run
        } else {
            AnimationKey::Walk
        }
    } else if flags.combat {
        AnimationKey::CombatIdle
    } else {
        AnimationKey::Idle
    }
}

/// Requested animation change with its cross-fade duration
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnimationChange {
    pub key: AnimationKey,
    pub fade_in: f32,
}

/// Rate limiter for animation switches. Non-priority changes wait out the
/// cooldown started by the previous change.
#[derive(Debug, Clone, Default)]
pub struct AnimationGate {
    current: Option<AnimationKey>,
    cooldown: f32,
}

impl AnimationGate {
    pub fn current(&self) -> Option<AnimationKey> {
        self.current
    }

    pub fn tick(&mut self, dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
    }

    /// Returns the key when it should start playing now.
    pub fn request(&mut self, key: AnimationKey, cooldown: f32) -> Option<AnimationKey> {
        if self.current == Some(key) {
            return None;
        }
        if !key.is_priority() && self.cooldown > 0.0 {
            return None;
        }
        self.current = Some(key);
        self.cooldown = cooldown;
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = AnimationKey::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), AnimationKey::ALL.len());
    }

    #[test]
    fn test_select_precedence() {
        let flags = PoseFlags {
            rolling: true,
            jump_loop: true,
            moving: true,
            ..Default::default()
        };
        assert_eq!(select(&flags), AnimationKey::Roll);

        let flags = PoseFlags {
            crouching: true,
            moving: true,
            running: true,
            ..Default::default()
        };
        assert_eq!(select(&flags), AnimationKey::CrouchWalk);

        let flags = PoseFlags {
            moving: true,
            running: true,
            backward_only: true,
            ..Default::default()
        };
        assert_eq!(select(&flags), AnimationKey::WalkBackward);

        assert_eq!(select(&PoseFlags::default()), AnimationKey::Idle);
    }

    #[test]
    fn test_gate_rate_limits_normal_changes() {
        let mut gate = AnimationGate::default();
        assert_eq!(gate.request(AnimationKey::Walk, 0.1), Some(AnimationKey::Walk));
        assert_eq!(gate.request(AnimationKey::Run, 0.1), None);
        gate.tick(0.05);
        assert_eq!(gate.request(AnimationKey::Run, 0.1), None);
        gate.tick(0.06);
        assert_eq!(gate.request(AnimationKey::Run, 0.1), Some(AnimationKey::Run));
    }

    #[test]
    fn test_priority_bypasses_cooldown() {
        let mut gate = AnimationGate::default();
        gate.request(AnimationKey::Run, 0.1);
        assert_eq!(
            gate.request(AnimationKey::JumpStart, 0.1),
            Some(AnimationKey::JumpStart)
        );
        assert_eq!(gate.current(), Some(AnimationKey::JumpStart));
    }

    #[test]
    fn test_same_key_is_not_restarted() {
        let mut gate = AnimationGate::default();
        gate.request(AnimationKey::Idle, 0.1);
        gate.tick(1.0);
        assert_eq!(gate.request(AnimationKey::Idle, 0.1), None);
    }
}
