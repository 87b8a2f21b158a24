//! Procedural foot placement for headless runs.
//!
//! Drives the two foot bones from horizontal speed so the footstep pipeline
//! sees the same signal an animated skeleton would give: feet swing forward
//! and back along the facing, and each lifts once per cycle, half a cycle
//! apart.

use nalgebra::Vector3;
use serde::Serialize;
use std::f32::consts::TAU;

use super::bones::Foot;
use super::constants::gait as consts;
use super::locomotion::motion::yaw_forward;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FootPose {
    pub foot: Foot,
    /// World position of the foot bone
    pub position: Vector3<f32>,
    pub lift: f32,
}

#[derive(Debug, Clone, Default)]
pub struct GaitPose {
    /// Cycle position in [0, 1)
    phase: f32,
}

impl GaitPose {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Advances the cycle and places both feet. `sole` is the world position
    /// of the capsule bottom; `airborne` tucks both feet up.
    pub fn advance(&mut self, sole: Vector3<f32>, yaw: f32, speed: f32, airborne: bool, dt: f32) -> [FootPose; 2] {
        let speed = speed.max(0.0);
        let walking = speed >= consts::MIN_SPEED;
        let stride = consts::BASE_STRIDE + consts::STRIDE_PER_SPEED * speed;
        if walking && !airborne {
            self.phase = (self.phase + dt.max(0.0) * speed / stride).rem_euclid(1.0);
        } else {
            self.phase = 0.0;
        }

        let forward = yaw_forward(yaw);
        let right = Vector3::new(-forward.z, 0.0, forward.x);
        // Each foot swings a quarter stride either side of the hip.
        let reach = if walking { 0.25 * stride } else { 0.0 };

        Foot::BOTH.map(|foot| {
            let (side, offset) = match foot {
                Foot::Left => (-1.0, 0.0),
                Foot::Right => (1.0, 0.5),
            };
            let angle = TAU * (self.phase + offset);
            let lift = if airborne {
                consts::LIFT_HEIGHT
            } else if walking {
                angle.sin().max(0.0) * consts::LIFT_HEIGHT
            } else {
                0.0
            };
            let position = sole
                + forward * (reach * angle.cos())
                + right * (side * consts::FOOT_SPACING)
                + Vector3::new(0.0, consts::FOOT_HEIGHT + lift, 0.0);
            FootPose { foot, position, lift }
        })
    }
}
