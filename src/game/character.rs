//! Per-character glue between the physics body, the locomotion state machine
//! and the render-side outputs.
//!
//! A frame is split around the fixed physics steps:
//! `begin_frame` senses the world, advances locomotion, applies capsule and
//! velocity changes; `record_step` runs after every fixed step; `end_frame`
//! plays animation, fires effects and updates the render position and camera.

use nalgebra::{Point3, Vector3};
use rapier3d::prelude::RigidBodyHandle;
use serde::Serialize;
use std::collections::HashSet;

use super::animation::AnimationPlayer;
use super::bones::{Foot, ResolvedFeet};
use super::capsule::{CapsuleProfiles, CapsuleResizer, CapsuleShape};
use super::contact_sensor::ContactSensor;
use super::effects::EffectSink;
use super::footsteps::{FootstepEvent, FootstepTrigger, Gait};
use super::gait::GaitPose;
use super::input::{InputEdges, InputState};
use super::interpolation::{CameraPose, CameraRig, InterpolationBuffer};
use super::locomotion::motion::horizontal_speed;
use super::locomotion::{
    Action, AnimationKey, FrameCommands, FrameContext, JumpPhase, LocomotionState,
};
use super::physics::PhysicsWorld;
use crate::config::ControllerConfig;

/// Snapshot of one character after a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterFrame {
    /// Physics body center after this frame's steps
    pub position: Vector3<f32>,
    /// Interpolated container position for rendering
    pub render_position: Vector3<f32>,
    pub visual_offset_y: f32,
    pub velocity: Vector3<f32>,
    pub grounded: bool,
    /// A standing capsule would fit, as sensed at the start of the frame
    pub ceiling_clear: bool,
    pub jump_phase: JumpPhase,
    pub crouching: bool,
    pub rolling: bool,
    pub dancing: bool,
    pub attacking: bool,
    pub combat_mode: bool,
    pub facing_yaw: f32,
    pub capsule: CapsuleShape,
    pub half_height: f32,
    pub animation: Option<AnimationKey>,
    pub action: Option<Action>,
    pub landed: bool,
    pub footstep: Option<FootstepEvent>,
    pub camera: CameraPose,
}

pub struct CharacterController {
    id: u64,
    config: ControllerConfig,
    body: RigidBodyHandle,
    sensor: ContactSensor,
    resizer: CapsuleResizer,
    locomotion: LocomotionState,
    edges: InputEdges,
    feet: ResolvedFeet,
    gait: GaitPose,
    footsteps: FootstepTrigger,
    interpolation: InterpolationBuffer,
    camera: CameraRig,
    ceiling_clear: bool,
    missing_clips: HashSet<String>,
}

impl CharacterController {
    /// Attaches a standing capsule whose bottom rests at `feet_position` and
    /// binds the foot bones found in `skeleton`. Returns `None` when the
    /// entity already has a body.
    pub fn spawn<S: AsRef<str>>(
        world: &mut PhysicsWorld,
        id: u64,
        feet_position: Vector3<f32>,
        config: ControllerConfig,
        skeleton: &[S],
    ) -> Option<Self> {
        let profiles = CapsuleProfiles::new(config.capsule.height, config.capsule.radius);
        let center = feet_position + Vector3::new(0.0, profiles.standing.bottom_offset(), 0.0);
        let body = world.attach_character(id, [center.x, center.y, center.z], profiles.standing)?;
        let feet = config.bones.resolve(skeleton);
        log::info!(
            "[Character] Spawned {} at ({:.2}, {:.2}, {:.2})",
            id,
            center.x,
            center.y,
            center.z
        );

        let mut interpolation = InterpolationBuffer::new();
        interpolation.push(center);

        Some(Self {
            id,
            sensor: ContactSensor::new(Some(body)),
            resizer: CapsuleResizer::new(id, profiles, config.capsule.y_offset),
            locomotion: LocomotionState::default(),
            edges: InputEdges::new(),
            feet,
            gait: GaitPose::new(),
            footsteps: FootstepTrigger::new(config.footsteps.seed),
            interpolation,
            camera: CameraRig::new(&config.camera),
            ceiling_clear: true,
            missing_clips: HashSet::new(),
            body,
            config,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn locomotion(&self) -> &LocomotionState {
        &self.locomotion
    }

    pub fn resizer(&self) -> &CapsuleResizer {
        &self.resizer
    }

    pub fn feet(&self) -> ResolvedFeet {
        self.feet
    }

    /// Sense, decide and apply. Returns `None` when the body is gone.
    pub fn begin_frame(&mut self, world: &mut PhysicsWorld, input: &InputState, dt: f32) -> Option<FrameCommands> {
        let position = world.translation(self.body)?;
        let velocity = world.linvel(self.body)?;
        let pressed = self.edges.detect(input);

        let grounded = self.sensor.is_grounded(
            world,
            position,
            self.resizer.half_height(),
            self.resizer.radius(),
        );
        let ceiling_clear = self.sensor.has_ceiling_clearance(
            world,
            position,
            self.resizer.half_height(),
            self.resizer.profiles(),
        );

        self.ceiling_clear = ceiling_clear;

        if input.orbit {
            self.camera.orbit(input.pointer_delta);
        }

        let ctx = FrameContext {
            dt,
            input: *input,
            pressed,
            grounded,
            ceiling_clear,
            velocity,
        };
        let commands = self.locomotion.advance(&ctx, &self.config);

        if let Some(shape) = commands.capsule {
            if let Some(shift) = self.resizer.apply(world, shape) {
                self.interpolation.shift(Vector3::new(0.0, shift, 0.0));
            }
        }
        world.set_linvel(self.body, commands.velocity);
        Some(commands)
    }

    /// Records the body position after one fixed step.
    pub fn record_step(&mut self, world: &PhysicsWorld) {
        if let Some(position) = world.translation(self.body) {
            self.interpolation.push(position);
        }
    }

    pub fn end_frame(
        &mut self,
        world: &PhysicsWorld,
        commands: &FrameCommands,
        alpha: f32,
        dt: f32,
        player: &mut dyn AnimationPlayer,
        effects: &mut dyn EffectSink,
    ) -> Option<CharacterFrame> {
        let position = world.translation(self.body)?;
        let velocity = world.linvel(self.body).unwrap_or_else(Vector3::zeros);

        if let Some(change) = commands.animation {
            self.play_animation(player, change.key, change.fade_in);
        }

        let sole = position - Vector3::new(0.0, self.resizer.half_height() + self.resizer.radius(), 0.0);
        let speed = horizontal_speed(&velocity);
        let footstep = self.update_footsteps(world, commands, sole, speed, dt, effects);

        let render_position = self.interpolation.sample(alpha).unwrap_or(position);
        let camera = self.camera.update(
            render_position,
            self.locomotion.rotation_target,
            dt,
            self.config.movement.frame_coupled,
        );

        let state = &self.locomotion;
        Some(CharacterFrame {
            position,
            render_position,
            visual_offset_y: self.resizer.visual_offset_y(),
            velocity,
            grounded: state.is_grounded,
            ceiling_clear: self.ceiling_clear,
            jump_phase: state.jump_phase,
            crouching: state.is_crouching,
            rolling: state.is_rolling,
            dancing: state.is_dancing,
            attacking: state.is_attacking,
            combat_mode: state.combat_mode,
            facing_yaw: state.character_rotation,
            capsule: self.resizer.shape(),
            half_height: self.resizer.half_height(),
            animation: state.current_animation(),
            action: commands.action,
            landed: commands.landed,
            footstep,
            camera,
        })
    }

    fn gait_for(&self, speed: f32) -> Gait {
        let movement = &self.config.movement;
        if self.locomotion.is_crouching {
            Gait::Crouch
        } else if speed > 0.5 * (movement.walk_speed + movement.run_speed) {
            Gait::Run
        } else {
            Gait::Walk
        }
    }

    fn update_footsteps(
        &mut self,
        world: &PhysicsWorld,
        commands: &FrameCommands,
        sole: Vector3<f32>,
        speed: f32,
        dt: f32,
        effects: &mut dyn EffectSink,
    ) -> Option<FootstepEvent> {
        let sole_point = Point3::from(sole);
        if commands.landed {
            effects.landing(sole_point, self.resizer.radius());
            let event = self.footsteps.force_step(Gait::Land, speed, &self.config.footsteps);
            // Feet already on the ground must not fire a second touchdown.
            self.footsteps.reset_tracks();
            effects.footstep(&event, sole_point);
            return Some(event);
        }

        let airborne = !self.locomotion.is_grounded || self.locomotion.is_rolling;
        let poses = self
            .gait
            .advance(sole, self.locomotion.character_rotation, speed, airborne, dt);
        let feet = Foot::BOTH.map(|foot| {
            self.feet
                .get(foot)
                .map(|_| poses[foot.index()].position)
        });
        let gait = self.gait_for(speed);
        let event = self.footsteps.update(
            &self.sensor,
            world,
            feet,
            gait,
            speed,
            dt,
            &self.config.footsteps,
        )?;
        effects.footstep(&event, sole_point);
        Some(event)
    }

    /// Plays the clip mapped to `key`. A clip the player lacks is reported
    /// once and skipped from then on.
    fn play_animation(&mut self, player: &mut dyn AnimationPlayer, key: AnimationKey, fade_in: f32) {
        let clip = self.config.animations.clip_for(key.name());
        if self.missing_clips.contains(clip) {
            return;
        }
        if !player.has_clip(clip) {
            log::warn!("[Character] Animation clip '{}' not found, skipping", clip);
            self.missing_clips.insert(clip.to_string());
            return;
        }
        if let Err(e) = player.play(clip, fade_in) {
            log::warn!("[Character] {}", e);
            self.missing_clips.insert(clip.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::animation::{AnimationMixer, ClipInfo};
    use crate::game::effects::EffectRouter;

    const SKELETON: [&str; 3] = ["Hips", "mixamorigLeftFoot", "mixamorigRightFoot"];

    fn world_with_floor() -> PhysicsWorld {
        let mut world = PhysicsWorld::new();
        world.add_block(1, [0.0, -0.5, 0.0], [40.0, 1.0, 40.0]);
        world.refresh_queries();
        world
    }

    fn run_frame(
        character: &mut CharacterController,
        world: &mut PhysicsWorld,
        input: &InputState,
        mixer: &mut AnimationMixer,
        effects: &mut EffectRouter,
    ) -> CharacterFrame {
        let dt = 1.0 / 60.0;
        world.refresh_queries();
        let commands = character.begin_frame(world, input, dt).unwrap();
        world.step();
        character.record_step(world);
        character
            .end_frame(world, &commands, 0.0, dt, mixer, effects)
            .unwrap()
    }

    #[test]
    fn test_spawn_places_capsule_bottom_on_feet() {
        let mut world = world_with_floor();
        let character =
            CharacterController::spawn(&mut world, 5, Vector3::zeros(), ControllerConfig::default(), &SKELETON)
                .unwrap();
        let center = world.translation(character.body()).unwrap();
        assert!((center.y - 1.0).abs() < 1e-6);
        assert_eq!(character.feet().left, Some(1));
        assert_eq!(character.feet().right, Some(2));
    }

    #[test]
    fn test_first_frame_blends_from_spawn() {
        let mut world = world_with_floor();
        let mut character =
            CharacterController::spawn(&mut world, 5, Vector3::new(0.0, 0.5, 0.0), ControllerConfig::default(), &SKELETON)
                .unwrap();
        let spawn = world.translation(character.body()).unwrap();
        assert_eq!(character.interpolation.sample(0.0), Some(spawn));
        assert_eq!(character.interpolation.sample(1.0), Some(spawn));

        // Falling onto the floor: three steps in one frame.
        let mut mixer = AnimationMixer::default();
        let mut effects = EffectRouter::default();
        let dt = 0.05;
        world.refresh_queries();
        let commands = character.begin_frame(&mut world, &InputState::default(), dt).unwrap();
        for _ in 0..3 {
            world.step();
            character.record_step(&world);
        }
        let frame = character
            .end_frame(&world, &commands, 0.0, dt, &mut mixer, &mut effects)
            .unwrap();
        assert!(frame.position.y < spawn.y);
        // Previous slot holds the second step, not a copy of the latest.
        assert!(frame.render_position.y > frame.position.y);
        assert!(frame.render_position.y < spawn.y);
    }

    #[test]
    fn test_second_spawn_for_same_id_is_rejected() {
        let mut world = world_with_floor();
        let first =
            CharacterController::spawn(&mut world, 5, Vector3::zeros(), ControllerConfig::default(), &SKELETON);
        assert!(first.is_some());
        let second =
            CharacterController::spawn(&mut world, 5, Vector3::zeros(), ControllerConfig::default(), &SKELETON);
        assert!(second.is_none());
    }

    #[test]
    fn test_missing_clip_is_skipped() {
        let mut world = world_with_floor();
        let mut character =
            CharacterController::spawn(&mut world, 5, Vector3::zeros(), ControllerConfig::default(), &SKELETON)
                .unwrap();
        let mut mixer = AnimationMixer::with_clips([("walk", ClipInfo { length: 1.0, looped: true })]);
        let mut effects = EffectRouter::default();
        let frame = run_frame(&mut character, &mut world, &InputState::default(), &mut mixer, &mut effects);
        assert_eq!(frame.animation, Some(AnimationKey::Idle));
        assert!(mixer.current().is_none());
        assert!(character.missing_clips.contains("idle"));
    }

    #[test]
    fn test_detached_body_is_a_no_op() {
        let mut world = world_with_floor();
        let mut character =
            CharacterController::spawn(&mut world, 5, Vector3::zeros(), ControllerConfig::default(), &SKELETON)
                .unwrap();
        world.detach_character(5);
        assert!(character
            .begin_frame(&mut world, &InputState::default(), 1.0 / 60.0)
            .is_none());
    }
}
