//! Render-side smoothing between fixed physics steps, and the follow camera.

use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::Serialize;

use super::locomotion::motion::frame_lerp;
use crate::config::CameraConfig;

/// Last two post-step body positions. The render position blends them by the
/// stepper's leftover fraction.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpolationBuffer {
    previous: Option<Vector3<f32>>,
    current: Option<Vector3<f32>>,
}

impl InterpolationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the body position after a physics step. The first record
    /// fills both slots.
    pub fn push(&mut self, position: Vector3<f32>) {
        self.previous = Some(self.current.unwrap_or(position));
        self.current = Some(position);
    }

    /// Moves both slots, e.g. when a capsule resize moved the body.
    pub fn shift(&mut self, offset: Vector3<f32>) {
        if let Some(p) = self.previous.as_mut() {
            *p += offset;
        }
        if let Some(c) = self.current.as_mut() {
            *c += offset;
        }
    }

    pub fn sample(&self, alpha: f32) -> Option<Vector3<f32>> {
        let current = self.current?;
        let previous = self.previous.unwrap_or(current);
        Some(previous.lerp(&current, alpha.clamp(0.0, 1.0)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraPose {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

/// Third-person follow camera with an optional orbit offset.
#[derive(Debug, Clone)]
pub struct CameraRig {
    position_offset: Vector3<f32>,
    target_offset: Vector3<f32>,
    follow_lerp: f32,
    orbit_sensitivity: f32,
    pitch_limit: f32,
    orbit_yaw: f32,
    orbit_pitch: f32,
    pose: Option<CameraPose>,
}

impl CameraRig {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            position_offset: Vector3::from(config.position_offset),
            target_offset: Vector3::from(config.target_offset),
            follow_lerp: config.follow_lerp,
            orbit_sensitivity: config.orbit_sensitivity,
            pitch_limit: config.pitch_limit_degrees.to_radians(),
            orbit_yaw: 0.0,
            orbit_pitch: 0.0,
            pose: None,
        }
    }

    pub fn pose(&self) -> Option<CameraPose> {
        self.pose
    }

    pub fn orbit_angles(&self) -> (f32, f32) {
        (self.orbit_yaw, self.orbit_pitch)
    }

    /// Applies pointer motion in orbit-follow mode. Vertical orbit is clamped.
    pub fn orbit(&mut self, pointer_delta: [f32; 2]) {
        self.orbit_yaw -= pointer_delta[0] * self.orbit_sensitivity;
        self.orbit_pitch = (self.orbit_pitch + pointer_delta[1] * self.orbit_sensitivity)
            .clamp(-self.pitch_limit, self.pitch_limit);
    }

    /// Follows the rendered container. `base_yaw` is the character's turn
    /// target; the orbit angles are added on top. The first update snaps.
    pub fn update(&mut self, container: Vector3<f32>, base_yaw: f32, dt: f32, frame_coupled: bool) -> CameraPose {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), base_yaw + self.orbit_yaw)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.orbit_pitch);
        let desired = CameraPose {
            position: Point3::from(container + rotation * self.position_offset),
            target: Point3::from(container + self.target_offset),
        };

        let pose = match self.pose {
            None => desired,
            Some(last) => {
                let t = frame_lerp(self.follow_lerp, dt, frame_coupled);
                CameraPose {
                    position: last.position + (desired.position - last.position) * t,
                    target: last.target + (desired.target - last.target) * t,
                }
            }
        };
        self.pose = Some(pose);
        pose
    }
}
