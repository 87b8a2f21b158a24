//! Raycast-backed contact queries: grounded, ceiling clearance and foot contact.
//!
//! Every query excludes the character's own body. Query failures degrade to
//! the safer answer: not grounded, not clear, no foot contact.

use nalgebra::{Point3, Vector3};
use rapier3d::prelude::RigidBodyHandle;

use super::capsule::CapsuleProfiles;
use super::constants::contact as consts;
use super::physics::{RayHit, RayQuery};

/// Foot ray result with the derived slope factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootHit {
    pub toi: f32,
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    /// 0 on flat ground, approaching 1 on vertical surfaces
    pub slope: f32,
}

impl From<RayHit> for FootHit {
    fn from(hit: RayHit) -> Self {
        Self {
            toi: hit.toi,
            point: hit.point,
            normal: hit.normal,
            slope: slope_factor(&hit.normal),
        }
    }
}

/// `1 - clamp(normal.y, 0, 1)`
pub fn slope_factor(normal: &Vector3<f32>) -> f32 {
    1.0 - normal.y.clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy)]
pub struct ContactSensor {
    exclude: Option<RigidBodyHandle>,
}

impl ContactSensor {
    pub fn new(exclude: Option<RigidBodyHandle>) -> Self {
        Self { exclude }
    }

    fn down() -> Vector3<f32> {
        Vector3::new(0.0, -1.0, 0.0)
    }

    /// Ground check from the capsule bottom. `position` is the body center.
    pub fn is_grounded<Q: RayQuery + ?Sized>(
        &self,
        rays: &Q,
        position: Vector3<f32>,
        half_height: f32,
        radius: f32,
    ) -> bool {
        let bottom = position.y - half_height - radius;
        let origin = Point3::new(position.x, bottom + consts::RAY_ORIGIN_BIAS, position.z);
        match rays.cast_ray(origin, Self::down(), consts::GROUND_RAY_LENGTH, self.exclude) {
            Ok(Some(hit)) => hit.toi <= consts::GROUND_RAY_LENGTH,
            Ok(None) => false,
            Err(e) => {
                log::debug!("[Contact] Ground ray failed: {}", e);
                false
            }
        }
    }

    /// Whether a standing capsule would fit, probing upward from the top of a
    /// crouched capsule resting on the same bottom point.
    pub fn has_ceiling_clearance<Q: RayQuery + ?Sized>(
        &self,
        rays: &Q,
        position: Vector3<f32>,
        current_half_height: f32,
        profiles: &CapsuleProfiles,
    ) -> bool {
        let radius = profiles.standing.radius;
        let bottom = position.y - current_half_height - radius;
        let crouch_top = bottom + 2.0 * (profiles.crouching.half_height + radius);
        let length = (profiles.standing.half_height - profiles.crouching.half_height)
            + consts::CEILING_SAFETY_MARGIN;
        let origin = Point3::new(position.x, crouch_top, position.z);

        match rays.cast_ray(origin, Vector3::new(0.0, 1.0, 0.0), length, self.exclude) {
            Ok(hit) => hit.is_none(),
            Err(e) => {
                log::debug!("[Contact] Ceiling ray failed: {}", e);
                false
            }
        }
    }

    /// Foot contact below a bone's world position.
    pub fn foot_contact<Q: RayQuery + ?Sized>(
        &self,
        rays: &Q,
        bone_position: Vector3<f32>,
    ) -> Option<FootHit> {
        let origin = Point3::from(bone_position + Vector3::new(0.0, consts::RAY_ORIGIN_BIAS, 0.0));
        match rays.cast_ray(origin, Self::down(), consts::FOOT_RAY_LENGTH, self.exclude) {
            Ok(hit) => hit.map(FootHit::from),
            Err(e) => {
                log::debug!("[Contact] Foot ray failed: {}", e);
                None
            }
        }
    }
}
