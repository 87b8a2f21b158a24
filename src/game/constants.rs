//! Physics, locomotion and effect constants.
//! Values that a controller config can override live here as defaults.

/// Physics constants
pub mod physics {
    /// Gravity in m/s², fixed for the lifetime of the world
    pub const GRAVITY: f32 = 9.81;

    /// Fixed timestep for physics simulation (60 Hz)
    pub const TIMESTEP: f32 = 1.0 / 60.0;

    /// Largest frame delta fed into the accumulator (tab-resume guard)
    pub const MAX_FRAME_DELTA: f32 = 0.25;

    /// Hard cap on fixed steps per frame
    pub const MAX_STEPS_PER_FRAME: u32 = 10;

    /// Collider friction for every character capsule profile
    pub const CAPSULE_FRICTION: f32 = 0.5;

    /// Collider restitution for every character capsule profile
    pub const CAPSULE_RESTITUTION: f32 = 0.0;

    /// Small epsilon for float comparisons
    pub const EPSILON: f32 = 0.001;
}

/// Raycast geometry for the contact sensor
pub mod contact {
    /// Upward bias applied to every downward ray origin
    pub const RAY_ORIGIN_BIAS: f32 = 0.05;

    /// Ground ray length from the biased capsule bottom
    pub const GROUND_RAY_LENGTH: f32 = 0.2;

    /// Extra headroom required above a standing capsule
    pub const CEILING_SAFETY_MARGIN: f32 = 0.5;

    /// Foot ray length from the biased bone position
    pub const FOOT_RAY_LENGTH: f32 = 0.35;
}

/// Capsule sizing and resize policy
pub mod capsule {
    /// Default cylinder length of the standing capsule (half-height = height / 2)
    pub const DEFAULT_HEIGHT: f32 = 1.4;

    /// Default capsule radius
    pub const DEFAULT_RADIUS: f32 = 0.3;

    /// Crouching half-height as a fraction of the capsule height
    pub const CROUCH_HEIGHT_FACTOR: f32 = 0.25;

    /// Resizes smaller than this are skipped
    pub const RESIZE_TOLERANCE: f32 = 0.01;
}

/// Locomotion defaults (overridable through `[movement]` and `[timing]`)
pub mod locomotion {
    pub const WALK_SPEED: f32 = 2.0;
    pub const RUN_SPEED: f32 = 5.0;
    pub const ROLL_SPEED: f32 = 6.0;
    pub const JUMP_FORCE: f32 = 6.0;

    /// Crouched movement speed multiplier
    pub const CROUCH_SPEED_FACTOR: f32 = 0.5;

    /// Radians of turn per pixel of horizontal pointer motion
    pub const TURN_SENSITIVITY: f32 = 0.004;

    /// Horizontal velocity retained per reference frame when idle on the ground
    pub const IDLE_DAMPING: f32 = 0.85;

    /// Horizontal speed below which idle damping snaps to zero
    pub const VELOCITY_SNAP_EPSILON: f32 = 0.01;

    /// Fraction of horizontal velocity kept on landing
    pub const LANDING_VELOCITY_FACTOR: f32 = 0.2;

    /// Facing lerp factor per reference frame
    pub const ROTATION_LERP: f32 = 0.1;

    /// Frame duration the per-frame factors were tuned at
    pub const REFERENCE_FRAME: f32 = 1.0 / 60.0;

    pub const STAND_UP_DELAY: f32 = 0.5;
    pub const JUMP_START_DURATION: f32 = 0.2;
    pub const LAND_DURATION: f32 = 0.3;
    pub const ROLL_DURATION: f32 = 0.8;
    pub const CROUCH_TRANSITION_DURATION: f32 = 0.2;
    pub const ATTACK_DURATION: f32 = 0.6;
    pub const ANIMATION_CHANGE_COOLDOWN: f32 = 0.1;

    /// Slack for countdown timers built from summed f32 frame deltas
    pub const TIMER_EPSILON: f32 = 1.0e-4;
}

/// Footstep detection and effect tuning
pub mod footsteps {
    /// Foot TOI threshold on flat ground
    pub const FLAT_CONTACT_THRESHOLD: f32 = 0.23;

    /// Foot TOI threshold on slopes steeper than `STEEP_SLOPE`
    pub const SLOPE_CONTACT_THRESHOLD: f32 = 0.28;

    pub const STEEP_SLOPE: f32 = 0.4;

    /// Motion heuristics: at least one must hold for a step to fire
    pub const DOWNWARD_VELOCITY: f32 = -0.02;
    pub const VERTICAL_DELTA: f32 = 0.006;
    pub const SLOPE_TRIGGER: f32 = 0.35;
    pub const LATERAL_DELTA: f32 = 0.02;

    /// Cooldown before speed adaptation
    pub const COOLDOWN_BASE: f32 = 0.32;

    /// Cooldown seconds removed per m/s of horizontal speed
    pub const COOLDOWN_PER_SPEED: f32 = 0.03;

    pub const COOLDOWN_FLOOR_RUN: f32 = 0.12;
    pub const COOLDOWN_FLOOR_WALK: f32 = 0.18;

    pub const VOLUME_RUN: f32 = 0.8;
    pub const VOLUME_WALK: f32 = 0.5;
    pub const VOLUME_CROUCH: f32 = 0.25;
    pub const VOLUME_LAND: f32 = 0.9;

    /// Particles spawned around the capsule bottom on landing
    pub const LANDING_BURST: usize = 6;
}

/// Dust particle pool
pub mod particles {
    pub const POOL_CAPACITY: usize = 48;
    pub const LIFETIME: f32 = 0.6;
    pub const BASE_SCALE: f32 = 0.15;
    pub const LAUNCH_SPEED: f32 = 0.6;
    pub const DRAG: f32 = 2.5;
    pub const GRAVITY: f32 = 1.5;
}

/// Camera follow defaults
pub mod camera {
    /// Camera position anchor relative to the container, in character space
    pub const POSITION_OFFSET: [f32; 3] = [0.0, 2.0, -4.0];

    /// Look-at anchor relative to the container
    pub const TARGET_OFFSET: [f32; 3] = [0.0, 1.5, 0.0];

    /// Smoothing factor per reference frame
    pub const FOLLOW_LERP: f32 = 0.1;

    /// Radians of orbit per pixel of pointer motion
    pub const ORBIT_SENSITIVITY: f32 = 0.005;

    /// Vertical orbit limit in degrees
    pub const PITCH_LIMIT_DEGREES: f32 = 60.0;
}

/// Animation cross-fade defaults
pub mod animation {
    pub const FADE_IN: f32 = 0.2;
    pub const PRIORITY_FADE_IN: f32 = 0.1;
}

/// Procedural gait used when no animated skeleton drives the feet
pub mod gait {
    /// Foot bone height above the sole when planted
    pub const FOOT_HEIGHT: f32 = 0.08;
    pub const LIFT_HEIGHT: f32 = 0.2;
    /// Half the distance between the feet
    pub const FOOT_SPACING: f32 = 0.12;
    /// Stride length at rest; grows with speed
    pub const BASE_STRIDE: f32 = 1.0;
    pub const STRIDE_PER_SPEED: f32 = 0.2;
    /// Below this horizontal speed the feet settle
    pub const MIN_SPEED: f32 = 0.05;
}
