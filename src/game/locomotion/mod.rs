//! Locomotion state machine.
//!
//! `LocomotionState::advance` runs once per rendered frame, before the fixed
//! physics steps. It reads the sensed world (grounded, ceiling clearance, body
//! velocity) and input, and returns the commands for this frame: the desired
//! body velocity, an optional capsule shape change and an optional animation
//! change. It never touches the physics world itself.
//!
//! Update order within a frame is fixed: timers, turning, grounding, landing,
//! action resolution, roll, fall detection, crouch, velocity, jump, facing and
//! finally animation selection.

pub mod animation_select;
pub mod motion;
pub mod priority;
pub mod timers;

use nalgebra::Vector3;
use serde::Serialize;

use crate::config::ControllerConfig;
use crate::game::capsule::CapsuleShape;
use crate::game::constants::locomotion as consts;
use crate::game::input::{InputState, PressedThisFrame};

pub use animation_select::{AnimationChange, AnimationGate, AnimationKey, PoseFlags};
pub use priority::{Action, ActionRequests, ACTION_PRIORITY};
use motion::{
    damp_horizontal, frame_lerp, frame_retention, lerp_angle, wrap_angle, world_direction,
    yaw_forward, yaw_of,
};
use timers::Countdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JumpPhase {
    #[default]
    None,
    Start,
    Loop,
    Land,
}

impl JumpPhase {
    /// Rising or falling, as opposed to on the ground or landing
    pub fn is_airborne(self) -> bool {
        matches!(self, JumpPhase::Start | JumpPhase::Loop)
    }
}

/// Everything the state machine reads for one frame
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    pub dt: f32,
    pub input: InputState,
    pub pressed: PressedThisFrame,
    pub grounded: bool,
    pub ceiling_clear: bool,
    /// Body velocity before this frame's physics steps
    pub velocity: Vector3<f32>,
}

/// What the frame decided
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameCommands {
    pub velocity: Vector3<f32>,
    pub capsule: Option<CapsuleShape>,
    pub animation: Option<AnimationChange>,
    pub landed: bool,
    pub action: Option<Action>,
}

impl FrameCommands {
    fn keep(velocity: Vector3<f32>) -> Self {
        Self {
            velocity,
            capsule: None,
            animation: None,
            landed: false,
            action: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LocomotionState {
    pub is_grounded: bool,
    pub was_grounded: bool,
    pub is_crouching: bool,
    pub crouch_transitioning: bool,
    pub is_rolling: bool,
    pub is_dancing: bool,
    pub is_attacking: bool,
    pub combat_mode: bool,
    pub jump_phase: JumpPhase,
    /// Camera-relative yaw that movement input is rotated by
    pub rotation_target: f32,
    /// Yaw the visual model currently faces
    pub character_rotation: f32,
    pub character_rotation_target: f32,
    /// Continuous time the ceiling has been clear while crouched
    pub ceiling_clearance_timer: f32,
    roll_velocity: Vector3<f32>,
    jump_start_timer: Countdown,
    land_timer: Countdown,
    roll_timer: Countdown,
    crouch_transition_timer: Countdown,
    attack_timer: Countdown,
    animation: AnimationGate,
    initialized: bool,
}

impl Default for LocomotionState {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl LocomotionState {
    pub fn new(initial_yaw: f32) -> Self {
        let yaw = wrap_angle(initial_yaw);
        Self {
            is_grounded: false,
            was_grounded: false,
            is_crouching: false,
            crouch_transitioning: false,
            is_rolling: false,
            is_dancing: false,
            is_attacking: false,
            combat_mode: false,
            jump_phase: JumpPhase::None,
            rotation_target: yaw,
            character_rotation: yaw,
            character_rotation_target: yaw,
            ceiling_clearance_timer: 0.0,
            roll_velocity: Vector3::zeros(),
            jump_start_timer: Countdown::default(),
            land_timer: Countdown::default(),
            roll_timer: Countdown::default(),
            crouch_transition_timer: Countdown::default(),
            attack_timer: Countdown::default(),
            animation: AnimationGate::default(),
            initialized: false,
        }
    }

    pub fn current_animation(&self) -> Option<AnimationKey> {
        self.animation.current()
    }

    pub fn advance(&mut self, ctx: &FrameContext, config: &ControllerConfig) -> FrameCommands {
        let dt = if ctx.dt.is_finite() { ctx.dt.max(0.0) } else { 0.0 };
        let movement = &config.movement;
        let mut commands = FrameCommands::keep(ctx.velocity);

        self.expire_timers(dt, &mut commands);
        self.animation.tick(dt);

        if !ctx.input.orbit {
            self.rotation_target = wrap_angle(
                self.rotation_target - ctx.input.pointer_delta[0] * movement.turn_sensitivity,
            );
        }

        // Grounding. A capsule swap in progress keeps last frame's answer.
        self.was_grounded = self.is_grounded;
        if !self.crouch_transitioning {
            self.is_grounded = ctx.grounded;
        }
        if !self.initialized {
            self.was_grounded = self.is_grounded;
            self.initialized = true;
        }

        let landing = !self.is_rolling
            && self.is_grounded
            && (!self.was_grounded
                || (self.jump_phase == JumpPhase::Loop && ctx.velocity.y <= 0.0));
        if landing {
            self.jump_phase = JumpPhase::Land;
            self.jump_start_timer.clear();
            self.land_timer.arm(config.timing.land);
            commands.velocity.x *= consts::LANDING_VELOCITY_FACTOR;
            commands.velocity.z *= consts::LANDING_VELOCITY_FACTOR;
            commands.landed = true;
            log::debug!("[Locomotion] Landed, vy={:.2}", ctx.velocity.y);
        }

        if ctx.pressed.combat {
            self.combat_mode = !self.combat_mode;
        }

        let requests = ActionRequests {
            roll: ctx.pressed.roll && self.can_roll(),
            jump: ctx.pressed.jump && self.can_jump(),
            attack: ctx.pressed.attack && self.can_attack(),
            dance: ctx.pressed.dance && !self.is_dancing && self.can_dance(&ctx.input),
        };
        let action = requests.resolve();
        commands.action = action;
        if ctx.pressed.dance && self.is_dancing {
            self.is_dancing = false;
        }

        if action == Some(Action::Roll) {
            self.is_rolling = true;
            self.is_dancing = false;
            self.roll_timer.arm(config.timing.roll);
            self.roll_velocity = yaw_forward(self.character_rotation) * movement.roll_speed;
            self.ceiling_clearance_timer = 0.0;
            commands.capsule = Some(CapsuleShape::Rolling);
        }

        if !self.is_grounded
            && self.jump_phase == JumpPhase::None
            && !self.is_crouching
            && !self.is_rolling
        {
            self.jump_phase = JumpPhase::Loop;
        }

        self.update_crouch(ctx, config, dt, &mut commands);

        let direction = if self.is_attacking {
            None
        } else {
            world_direction(&ctx.input, self.rotation_target)
        };
        let moving = direction.is_some();
        let running = ctx.input.run && !self.is_crouching;

        if self.is_rolling {
            // Locked for the whole roll, input and steering ignored.
            commands.velocity.x = self.roll_velocity.x;
            commands.velocity.z = self.roll_velocity.z;
        } else if let Some(dir) = direction {
            self.is_dancing = false;
            let mut speed = if running { movement.run_speed } else { movement.walk_speed };
            if self.is_crouching {
                speed *= movement.crouch_speed_factor;
            }
            commands.velocity.x = dir.x * speed;
            commands.velocity.z = dir.z * speed;
            self.character_rotation_target = if ctx.input.backward_only() {
                self.rotation_target
            } else {
                yaw_of(&dir)
            };
        } else if self.is_grounded && !landing {
            let retention = frame_retention(movement.idle_damping, dt, movement.frame_coupled);
            commands.velocity = damp_horizontal(commands.velocity, retention);
        }

        match action {
            Some(Action::Jump) => {
                commands.velocity.y = movement.jump_force;
                self.jump_phase = JumpPhase::Start;
                self.jump_start_timer.arm(config.timing.jump_start);
                self.land_timer.clear();
                self.is_dancing = false;
            }
            Some(Action::Attack) => {
                self.is_attacking = true;
                self.is_dancing = false;
                self.attack_timer.arm(config.timing.attack);
            }
            Some(Action::Dance) => self.is_dancing = true,
            Some(Action::Roll) | None => {}
        }

        if !self.is_rolling {
            let t = frame_lerp(movement.rotation_lerp, dt, movement.frame_coupled);
            self.character_rotation =
                lerp_angle(self.character_rotation, self.character_rotation_target, t);
        }

        let flags = PoseFlags {
            rolling: self.is_rolling,
            jump_start: self.jump_phase == JumpPhase::Start,
            jump_loop: self.jump_phase == JumpPhase::Loop,
            landing: self.jump_phase == JumpPhase::Land,
            attacking: self.is_attacking,
            dancing: self.is_dancing,
            crouching: self.is_crouching,
            combat: self.combat_mode,
            moving,
            running,
            backward_only: ctx.input.backward_only(),
        };
        let key = animation_select::select(&flags);
        if let Some(key) = self.animation.request(key, config.timing.animation_cooldown) {
            let fade_in = if key.is_priority() {
                config.animations.priority_fade_in
            } else {
                config.animations.fade_in
            };
            commands.animation = Some(AnimationChange { key, fade_in });
        }

        commands
    }

    fn can_roll(&self) -> bool {
        self.is_grounded
            && !self.jump_phase.is_airborne()
            && !self.is_crouching
            && !self.is_dancing
            && !self.is_attacking
            && !self.is_rolling
    }

    fn can_jump(&self) -> bool {
        self.is_grounded
            && !self.is_rolling
            && matches!(self.jump_phase, JumpPhase::None | JumpPhase::Land)
    }

    fn can_attack(&self) -> bool {
        self.combat_mode
            && self.is_grounded
            && !self.jump_phase.is_airborne()
            && !self.is_rolling
            && !self.is_attacking
    }

    fn can_dance(&self, input: &InputState) -> bool {
        self.is_grounded
            && self.jump_phase == JumpPhase::None
            && !self.is_rolling
            && !self.is_attacking
            && !self.is_crouching
            && !input.has_direction()
    }

    /// Timed transitions. Each re-checks that its state is still current.
    fn expire_timers(&mut self, dt: f32, commands: &mut FrameCommands) {
        if self.jump_start_timer.tick(dt) && self.jump_phase == JumpPhase::Start {
            self.jump_phase = JumpPhase::Loop;
        }
        if self.land_timer.tick(dt) && self.jump_phase == JumpPhase::Land {
            self.jump_phase = JumpPhase::None;
        }
        if self.roll_timer.tick(dt) && self.is_rolling {
            self.is_rolling = false;
            self.roll_velocity = Vector3::zeros();
            commands.capsule = Some(CapsuleShape::Standing);
        }
        if self.crouch_transition_timer.tick(dt) {
            self.crouch_transitioning = false;
        }
        if self.attack_timer.tick(dt) && self.is_attacking {
            self.is_attacking = false;
        }
    }

    fn update_crouch(
        &mut self,
        ctx: &FrameContext,
        config: &ControllerConfig,
        dt: f32,
        commands: &mut FrameCommands,
    ) {
        if self.is_rolling {
            self.ceiling_clearance_timer = 0.0;
            return;
        }
        let blocked = !ctx.ceiling_clear;

        if !self.is_crouching {
            self.ceiling_clearance_timer = 0.0;
            let by_key = ctx.input.crouch && self.is_grounded && !self.jump_phase.is_airborne();
            if by_key || blocked {
                self.is_crouching = true;
                self.is_dancing = false;
                self.begin_crouch_transition(config);
                commands.capsule = Some(CapsuleShape::Crouching);
            }
            return;
        }

        if ctx.input.crouch || blocked {
            self.ceiling_clearance_timer = 0.0;
            return;
        }

        self.ceiling_clearance_timer += dt;
        if self.ceiling_clearance_timer + consts::TIMER_EPSILON >= config.timing.stand_up_delay {
            self.is_crouching = false;
            self.ceiling_clearance_timer = 0.0;
            self.begin_crouch_transition(config);
            commands.capsule = Some(CapsuleShape::Standing);
        }
    }

    fn begin_crouch_transition(&mut self, config: &ControllerConfig) {
        self.crouch_transitioning = true;
        self.crouch_transition_timer.arm(config.timing.crouch_transition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn ctx(input: InputState, pressed: PressedThisFrame, grounded: bool) -> FrameContext {
        FrameContext {
            dt: DT,
            input,
            pressed,
            grounded,
            ceiling_clear: true,
            velocity: Vector3::zeros(),
        }
    }

    fn idle(grounded: bool) -> FrameContext {
        ctx(InputState::default(), PressedThisFrame::default(), grounded)
    }

    fn jump_press() -> PressedThisFrame {
        PressedThisFrame {
            jump: true,
            ..Default::default()
        }
    }

    fn roll_press() -> PressedThisFrame {
        PressedThisFrame {
            roll: true,
            ..Default::default()
        }
    }

    fn settled(config: &ControllerConfig) -> LocomotionState {
        let mut state = LocomotionState::default();
        state.advance(&idle(true), config);
        state
    }

    #[test]
    fn test_first_frame_is_not_a_landing() {
        let config = ControllerConfig::default();
        let mut state = LocomotionState::default();
        let commands = state.advance(&idle(true), &config);
        assert!(!commands.landed);
        assert_eq!(state.jump_phase, JumpPhase::None);
        assert_eq!(commands.animation.map(|a| a.key), Some(AnimationKey::Idle));
    }

    #[test]
    fn test_jump_lifecycle() {
        let config = ControllerConfig::default();
        let mut state = settled(&config);

        let commands = state.advance(&ctx(InputState::default(), jump_press(), true), &config);
        assert_eq!(commands.action, Some(Action::Jump));
        assert_eq!(commands.velocity.y, 6.0);
        assert_eq!(state.jump_phase, JumpPhase::Start);
        assert_eq!(commands.animation.map(|a| a.key), Some(AnimationKey::JumpStart));

        let mut airborne = idle(false);
        airborne.velocity = Vector3::new(3.0, 4.0, 0.0);
        for _ in 0..11 {
            state.advance(&airborne, &config);
            assert_eq!(state.jump_phase, JumpPhase::Start);
        }
        state.advance(&airborne, &config);
        assert_eq!(state.jump_phase, JumpPhase::Loop);

        let mut touchdown = idle(true);
        touchdown.velocity = Vector3::new(3.0, -2.0, 0.0);
        let commands = state.advance(&touchdown, &config);
        assert!(commands.landed);
        assert_eq!(state.jump_phase, JumpPhase::Land);
        assert!((commands.velocity.x - 0.6).abs() < 1e-5);
        assert_eq!(commands.velocity.y, -2.0);

        for _ in 0..17 {
            state.advance(&idle(true), &config);
            assert_eq!(state.jump_phase, JumpPhase::Land);
        }
        state.advance(&idle(true), &config);
        assert_eq!(state.jump_phase, JumpPhase::None);
    }

    #[test]
    fn test_jump_rejected_in_air() {
        let config = ControllerConfig::default();
        let mut state = settled(&config);
        state.advance(&idle(false), &config);
        assert_eq!(state.jump_phase, JumpPhase::Loop);

        let commands = state.advance(&ctx(InputState::default(), jump_press(), false), &config);
        assert_eq!(commands.action, None);
        assert_eq!(commands.velocity.y, 0.0);
    }

    #[test]
    fn test_roll_wins_over_jump() {
        let config = ControllerConfig::default();
        let mut state = settled(&config);
        let pressed = PressedThisFrame {
            jump: true,
            roll: true,
            ..Default::default()
        };
        let commands = state.advance(&ctx(InputState::default(), pressed, true), &config);
        assert_eq!(commands.action, Some(Action::Roll));
        assert!(state.is_rolling);
        assert_eq!(state.jump_phase, JumpPhase::None);
        assert_eq!(commands.velocity.y, 0.0);
        assert_eq!(commands.capsule, Some(CapsuleShape::Rolling));
    }

    #[test]
    fn test_roll_velocity_is_locked() {
        let config = ControllerConfig::default();
        let mut state = settled(&config);
        let commands = state.advance(&ctx(InputState::default(), roll_press(), true), &config);
        assert!((commands.velocity.z - 6.0).abs() < 1e-6);
        assert!(commands.velocity.x.abs() < 1e-6);

        let steering = InputState {
            left: true,
            run: true,
            pointer_delta: [120.0, 0.0],
            ..Default::default()
        };
        for frame in 1..48 {
            let mut frame_ctx = ctx(steering, jump_press(), true);
            frame_ctx.velocity = Vector3::new(-4.0, 0.0, 1.0);
            let commands = state.advance(&frame_ctx, &config);
            assert!(state.is_rolling, "frame {}", frame);
            assert!(commands.velocity.x.abs() < 1e-6);
            assert!((commands.velocity.z - 6.0).abs() < 1e-6);
            assert_eq!(commands.action, None);
        }

        let commands = state.advance(&idle(true), &config);
        assert!(!state.is_rolling);
        assert_eq!(commands.capsule, Some(CapsuleShape::Standing));
    }

    #[test]
    fn test_crouch_under_low_ceiling_and_stand_up_delay() {
        let config = ControllerConfig::default();
        let mut state = settled(&config);

        let mut blocked = idle(true);
        blocked.ceiling_clear = false;
        let commands = state.advance(&blocked, &config);
        assert!(state.is_crouching);
        assert_eq!(commands.capsule, Some(CapsuleShape::Crouching));

        for _ in 0..10 {
            state.advance(&blocked, &config);
            assert!(state.is_crouching);
        }

        for _ in 0..29 {
            let commands = state.advance(&idle(true), &config);
            assert!(state.is_crouching);
            assert_eq!(commands.capsule, None);
        }
        let commands = state.advance(&idle(true), &config);
        assert!(!state.is_crouching);
        assert_eq!(commands.capsule, Some(CapsuleShape::Standing));
    }

    #[test]
    fn test_blocked_frame_resets_clearance() {
        let config = ControllerConfig::default();
        let mut state = settled(&config);
        let mut blocked = idle(true);
        blocked.ceiling_clear = false;
        state.advance(&blocked, &config);

        for _ in 0..20 {
            state.advance(&idle(true), &config);
        }
        state.advance(&blocked, &config);
        assert_eq!(state.ceiling_clearance_timer, 0.0);
        for _ in 0..20 {
            state.advance(&idle(true), &config);
        }
        assert!(state.is_crouching);
    }

    #[test]
    fn test_crouch_key_requires_ground() {
        let config = ControllerConfig::default();
        let mut state = settled(&config);
        let crouch = InputState {
            crouch: true,
            ..Default::default()
        };
        state.advance(&ctx(crouch, PressedThisFrame::default(), false), &config);
        assert!(!state.is_crouching);
        assert_eq!(state.jump_phase, JumpPhase::Loop);
    }

    #[test]
    fn test_crouched_walk_speed() {
        let config = ControllerConfig::default();
        let mut state = settled(&config);
        let input = InputState {
            forward: true,
            crouch: true,
            run: true,
            ..Default::default()
        };
        let commands = state.advance(&ctx(input, PressedThisFrame::default(), true), &config);
        assert!(state.is_crouching);
        assert!((commands.velocity.z - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_run_speed_and_facing() {
        let config = ControllerConfig::default();
        let mut state = settled(&config);
        let input = InputState {
            right: true,
            run: true,
            ..Default::default()
        };
        let commands = state.advance(&ctx(input, PressedThisFrame::default(), true), &config);
        assert!((commands.velocity.x + 5.0).abs() < 1e-5);
        assert!(state.character_rotation_target < 0.0);
        for _ in 0..300 {
            state.advance(&ctx(input, PressedThisFrame::default(), true), &config);
        }
        assert!((state.character_rotation + std::f32::consts::FRAC_PI_2).abs() < 1e-3);
    }

    #[test]
    fn test_idle_damping_is_frame_rate_independent() {
        let config = ControllerConfig::default();

        let mut at_60 = settled(&config);
        let mut v = Vector3::new(4.0, 0.0, 0.0);
        for _ in 0..2 {
            let mut frame = idle(true);
            frame.velocity = v;
            v = at_60.advance(&frame, &config).velocity;
        }

        let mut at_30 = settled(&config);
        let mut frame = idle(true);
        frame.dt = 2.0 * DT;
        frame.velocity = Vector3::new(4.0, 0.0, 0.0);
        let single = at_30.advance(&frame, &config).velocity;

        assert!((v.x - single.x).abs() < 1e-4, "{} vs {}", v.x, single.x);
        assert!((v.x - 4.0 * 0.85 * 0.85).abs() < 1e-4);
    }

    #[test]
    fn test_frame_coupled_damping() {
        let mut config = ControllerConfig::default();
        config.movement.frame_coupled = true;
        let mut state = settled(&config);
        let mut frame = idle(true);
        frame.dt = 0.1;
        frame.velocity = Vector3::new(1.0, 0.0, 0.0);
        let v = state.advance(&frame, &config).velocity;
        assert!((v.x - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_turn_input_rotates_target() {
        let config = ControllerConfig::default();
        let mut state = settled(&config);
        let turn = InputState {
            pointer_delta: [100.0, 0.0],
            ..Default::default()
        };
        state.advance(&ctx(turn, PressedThisFrame::default(), true), &config);
        assert!((state.rotation_target + 0.4).abs() < 1e-5);

        let orbit = InputState {
            orbit: true,
            ..turn
        };
        state.advance(&ctx(orbit, PressedThisFrame::default(), true), &config);
        assert!((state.rotation_target + 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_dance_toggle_and_cancel() {
        let config = ControllerConfig::default();
        let mut state = settled(&config);
        let dance = PressedThisFrame {
            dance: true,
            ..Default::default()
        };
        state.advance(&ctx(InputState::default(), dance, true), &config);
        assert!(state.is_dancing);

        let walk = InputState {
            forward: true,
            ..Default::default()
        };
        state.advance(&ctx(walk, PressedThisFrame::default(), true), &config);
        assert!(!state.is_dancing);

        state.advance(&ctx(InputState::default(), dance, true), &config);
        assert!(state.is_dancing);
        state.advance(&ctx(InputState::default(), dance, true), &config);
        assert!(!state.is_dancing);
    }

    #[test]
    fn test_attack_requires_combat_mode() {
        let config = ControllerConfig::default();
        let mut state = settled(&config);
        let attack = PressedThisFrame {
            attack: true,
            ..Default::default()
        };
        state.advance(&ctx(InputState::default(), attack, true), &config);
        assert!(!state.is_attacking);

        let combat = PressedThisFrame {
            combat: true,
            ..Default::default()
        };
        state.advance(&ctx(InputState::default(), combat, true), &config);
        assert!(state.combat_mode);
        let commands = state.advance(&ctx(InputState::default(), attack, true), &config);
        assert_eq!(commands.action, Some(Action::Attack));
        for _ in 0..35 {
            state.advance(&idle(true), &config);
        }
        assert!(state.is_attacking);
        state.advance(&idle(true), &config);
        assert!(!state.is_attacking);
    }

    #[test]
    fn test_walking_off_a_ledge_falls() {
        let config = ControllerConfig::default();
        let mut state = settled(&config);
        let commands = state.advance(&idle(false), &config);
        assert_eq!(state.jump_phase, JumpPhase::Loop);
        assert_eq!(commands.animation.map(|a| a.key), Some(AnimationKey::JumpLoop));
    }

    #[test]
    fn test_normal_animation_changes_are_rate_limited() {
        let config = ControllerConfig::default();
        let mut state = settled(&config);
        let walk = InputState {
            forward: true,
            ..Default::default()
        };
        let commands = state.advance(&ctx(walk, PressedThisFrame::default(), true), &config);
        assert_eq!(commands.animation, None);
        let mut changed = None;
        for _ in 0..10 {
            let commands = state.advance(&ctx(walk, PressedThisFrame::default(), true), &config);
            if commands.animation.is_some() {
                changed = commands.animation;
                break;
            }
        }
        let change = changed.unwrap();
        assert_eq!(change.key, AnimationKey::Walk);
        assert_eq!(change.fade_in, config.animations.fade_in);
    }
}
