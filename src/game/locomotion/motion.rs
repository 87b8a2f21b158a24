use nalgebra::{UnitQuaternion, Vector3};
use std::f32::consts::{PI, TAU};

use crate::game::constants::locomotion as consts;
use crate::game::input::InputState;

/// Per-frame retention `factor` scaled to a frame of `dt` seconds.
///
/// `factor` is what one reference frame (1/60 s) keeps. With `frame_coupled`
/// the factor is applied as-is, once per rendered frame.
pub fn frame_retention(factor: f32, dt: f32, frame_coupled: bool) -> f32 {
    if frame_coupled {
        factor
    } else {
        factor.powf(dt.max(0.0) / consts::REFERENCE_FRAME)
    }
}

/// Per-frame lerp weight `t` scaled to a frame of `dt` seconds.
pub fn frame_lerp(t: f32, dt: f32, frame_coupled: bool) -> f32 {
    if frame_coupled {
        return t;
    }
    1.0 - frame_retention(1.0 - t, dt, frame_coupled)
}

/// Unit forward vector for a yaw angle. Yaw 0 faces +Z.
pub fn yaw_forward(yaw: f32) -> Vector3<f32> {
    Vector3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Yaw of a horizontal direction
pub fn yaw_of(direction: &Vector3<f32>) -> f32 {
    direction.x.atan2(direction.z)
}

/// Wraps an angle into (-PI, PI]
pub fn wrap_angle(angle: f32) -> f32 {
    let mut a = (angle + PI).rem_euclid(TAU) - PI;
    if a <= -PI {
        a += TAU;
    }
    a
}

/// Interpolates along the shorter arc between two angles.
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    wrap_angle(from + wrap_angle(to - from) * t)
}

/// Local-space movement from the held direction keys. Forward is +Z, right is -X.
pub fn local_direction(input: &InputState) -> Vector3<f32> {
    let mut local = Vector3::zeros();
    if input.forward {
        local.z += 1.0;
    }
    if input.backward {
        local.z -= 1.0;
    }
    if input.left {
        local.x += 1.0;
    }
    if input.right {
        local.x -= 1.0;
    }
    local
}

/// World-space unit movement direction, or `None` when the keys cancel out.
pub fn world_direction(input: &InputState, rotation_target: f32) -> Option<Vector3<f32>> {
    let local = local_direction(input);
    if local.norm_squared() < consts::VELOCITY_SNAP_EPSILON * consts::VELOCITY_SNAP_EPSILON {
        return None;
    }
    let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), rotation_target);
    Some((rotation * local).normalize())
}

/// Decays horizontal velocity by `retention`, snapping tiny speeds to zero.
pub fn damp_horizontal(velocity: Vector3<f32>, retention: f32) -> Vector3<f32> {
    let mut damped = velocity;
    damped.x *= retention;
    damped.z *= retention;
    if damped.x.hypot(damped.z) < consts::VELOCITY_SNAP_EPSILON {
        damped.x = 0.0;
        damped.z = 0.0;
    }
    damped
}

/// Horizontal speed of a velocity
pub fn horizontal_speed(velocity: &Vector3<f32>) -> f32 {
    velocity.x.hypot(velocity.z)
}
