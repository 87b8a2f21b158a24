//! Single-character simulation session: the physics world, the fixed-step
//! driver, the character and its animation and effect outputs.

mod frame_pipeline;

use crossbeam_channel::Receiver;
use nalgebra::Vector3;
use serde::Serialize;

use super::animation::{AnimationMixer, ClipInfo};
use super::character::{CharacterController, CharacterFrame};
use super::effects::{AudioCue, EffectRouter};
use super::input::InputState;
use super::locomotion::AnimationKey;
use super::physics::PhysicsWorld;
use super::stepper::FixedStepper;
use crate::config::{AnimationConfig, ControllerConfig};

/// Everything observable about one frame
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub time: f64,
    pub dt: f32,
    pub steps: u32,
    pub alpha: f32,
    /// The step cap was hit and backlog was dropped
    pub capped: bool,
    pub character: Option<CharacterFrame>,
    pub audio: Vec<AudioCue>,
    pub particles_active: usize,
}

pub struct Session {
    world: PhysicsWorld,
    stepper: FixedStepper,
    character: Option<CharacterController>,
    mixer: AnimationMixer,
    effects: EffectRouter,
    audio_rx: Receiver<AudioCue>,
    frame: u64,
    elapsed: f64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (effects, audio_rx) = EffectRouter::with_channel();
        Self {
            world: PhysicsWorld::new(),
            stepper: FixedStepper::new(),
            character: None,
            mixer: AnimationMixer::new(),
            effects,
            audio_rx,
            frame: 0,
            elapsed: 0.0,
        }
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    pub fn stepper(&self) -> &FixedStepper {
        &self.stepper
    }

    pub fn character(&self) -> Option<&CharacterController> {
        self.character.as_ref()
    }

    pub fn character_mut(&mut self) -> Option<&mut CharacterController> {
        self.character.as_mut()
    }

    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut AnimationMixer {
        &mut self.mixer
    }

    pub fn effects(&self) -> &EffectRouter {
        &self.effects
    }

    pub fn add_block(&mut self, id: u64, center: [f32; 3], size: [f32; 3]) {
        self.world.add_block(id, center, size);
        self.world.refresh_queries();
    }

    /// Removes a static block. Returns false for an unknown id.
    pub fn remove_block(&mut self, id: u64) -> bool {
        let removed = self.world.remove_block(id);
        self.world.refresh_queries();
        removed
    }

    /// Spawns the session's character and registers a clip for every
    /// animation key the config maps. Returns false if a character with this
    /// id already has a body.
    pub fn spawn_character<S: AsRef<str>>(
        &mut self,
        id: u64,
        feet_position: Vector3<f32>,
        config: ControllerConfig,
        skeleton: &[S],
    ) -> bool {
        register_clips(&mut self.mixer, &config.animations);
        match CharacterController::spawn(&mut self.world, id, feet_position, config, skeleton) {
            Some(character) => {
                self.character = Some(character);
                self.world.refresh_queries();
                true
            }
            None => false,
        }
    }

    /// Runs one rendered frame of `dt` seconds.
    pub fn frame(&mut self, input: &InputState, dt: f32) -> FrameReport {
        frame_pipeline::run_frame_phases(self, input, dt)
    }
}

/// Placeholder clip set for headless playback
fn register_clips(mixer: &mut AnimationMixer, animations: &AnimationConfig) {
    for key in AnimationKey::ALL {
        let looped = !matches!(
            key,
            AnimationKey::JumpStart | AnimationKey::JumpLand | AnimationKey::Roll | AnimationKey::Attack
        );
        mixer.add_clip(
            animations.clip_for(key.name()),
            ClipInfo {
                length: 1.0,
                looped,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::animation::AnimationPlayer;
    use crate::game::locomotion::JumpPhase;

    const DT: f32 = 1.0 / 60.0;

    fn session_on_floor() -> Session {
        let mut session = Session::new();
        session.add_block(0, [0.0, -0.5, 0.0], [20.0, 1.0, 20.0]);
        assert!(session.spawn_character(
            1,
            Vector3::zeros(),
            ControllerConfig::default(),
            &["mixamorigLeftFoot", "mixamorigRightFoot"],
        ));
        session
    }

    #[test]
    fn test_frame_without_character_still_steps() {
        let mut session = Session::new();
        let report = session.frame(&InputState::default(), DT);
        assert!(report.character.is_none());
        assert_eq!(report.steps, 1);
        assert_eq!(report.frame, 1);
    }

    #[test]
    fn test_spawn_registers_clips_and_plays_idle() {
        let mut session = session_on_floor();
        assert!(session.mixer().has_clip("idle"));
        assert!(session.mixer().has_clip("jump_land"));

        let report = session.frame(&InputState::default(), DT);
        let character = report.character.expect("character frame");
        assert_eq!(character.animation, Some(AnimationKey::Idle));
        assert_eq!(session.mixer().current(), Some("idle"));
    }

    #[test]
    fn test_duplicate_spawn_keeps_first_character() {
        let mut session = session_on_floor();
        assert!(!session.spawn_character(1, Vector3::new(5.0, 0.0, 0.0), ControllerConfig::default(), &[] as &[&str]));
        let position = session.character().map(|c| c.body()).and_then(|b| session.world().translation(b));
        assert!(position.is_some_and(|p| p.x.abs() < 1e-3));
    }

    #[test]
    fn test_removing_floor_drops_character() {
        let mut session = session_on_floor();
        for _ in 0..5 {
            session.frame(&InputState::default(), DT);
        }
        assert!(session.remove_block(0));

        let mut phase = JumpPhase::None;
        for _ in 0..30 {
            let report = session.frame(&InputState::default(), DT);
            phase = report.character.expect("character frame").jump_phase;
        }
        assert_eq!(phase, JumpPhase::Loop);
    }
}
