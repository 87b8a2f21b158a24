//! Capsule collider resizing between standing, crouching and rolling.
//!
//! The resize keeps the capsule's bottom point fixed in world space: the body
//! is moved by the change in half-height and the visual model gets the
//! opposite local offset, so neither the physical nor the rendered feet move.

use serde::{Deserialize, Serialize};

use super::constants::capsule as consts;
use super::physics::PhysicsWorld;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderProfile {
    /// Half the cylinder length, caps excluded
    pub half_height: f32,
    pub radius: f32,
}

impl ColliderProfile {
    /// Distance from the body center to the lowest point of the capsule
    pub fn bottom_offset(&self) -> f32 {
        self.half_height + self.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapsuleShape {
    Standing,
    Crouching,
    Rolling,
}

/// The three named profiles derived from one capsule height and radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleProfiles {
    pub standing: ColliderProfile,
    pub crouching: ColliderProfile,
    pub rolling: ColliderProfile,
}

impl CapsuleProfiles {
    pub fn new(capsule_height: f32, radius: f32) -> Self {
        Self {
            standing: ColliderProfile {
                half_height: capsule_height / 2.0,
                radius,
            },
            crouching: ColliderProfile {
                half_height: capsule_height * consts::CROUCH_HEIGHT_FACTOR,
                radius,
            },
            rolling: ColliderProfile {
                half_height: radius,
                radius,
            },
        }
    }

    pub fn get(&self, shape: CapsuleShape) -> ColliderProfile {
        match shape {
            CapsuleShape::Standing => self.standing,
            CapsuleShape::Crouching => self.crouching,
            CapsuleShape::Rolling => self.rolling,
        }
    }
}

/// Tracks the active capsule of one character and performs the swaps.
#[derive(Debug, Clone)]
pub struct CapsuleResizer {
    character_id: u64,
    profiles: CapsuleProfiles,
    shape: CapsuleShape,
    half_height: f32,
    visual_offset_y: f32,
}

impl CapsuleResizer {
    pub fn new(character_id: u64, profiles: CapsuleProfiles, visual_offset_y: f32) -> Self {
        Self {
            character_id,
            profiles,
            shape: CapsuleShape::Standing,
            half_height: profiles.standing.half_height,
            visual_offset_y,
        }
    }

    pub fn profiles(&self) -> &CapsuleProfiles {
        &self.profiles
    }

    pub fn shape(&self) -> CapsuleShape {
        self.shape
    }

    pub fn half_height(&self) -> f32 {
        self.half_height
    }

    pub fn radius(&self) -> f32 {
        self.profiles.standing.radius
    }

    /// Local Y of the visual model inside its container
    pub fn visual_offset_y(&self) -> f32 {
        self.visual_offset_y
    }

    /// Overrides the visual model offset (model swaps, editor tweaks)
    pub fn set_visual_offset_y(&mut self, offset: f32) {
        self.visual_offset_y = offset;
    }

    /// Overrides the tracked half-height without touching physics, for when the
    /// collider was rebuilt externally.
    pub fn set_half_height(&mut self, half_height: f32) {
        self.half_height = half_height;
    }

    /// Switches to a named profile. Returns the vertical body shift applied.
    pub fn apply(&mut self, world: &mut PhysicsWorld, shape: CapsuleShape) -> Option<f32> {
        let target = self.profiles.get(shape).half_height;
        let shift = self.resize(world, target);
        if (self.half_height - target).abs() < consts::RESIZE_TOLERANCE {
            self.shape = shape;
        }
        shift
    }

    /// Resizes the capsule to `target_half_height`.
    ///
    /// Returns `None` when nothing changed (within tolerance, or no body to
    /// resize), otherwise the vertical translation applied to the body.
    pub fn resize(&mut self, world: &mut PhysicsWorld, target_half_height: f32) -> Option<f32> {
        if (self.half_height - target_half_height).abs() < consts::RESIZE_TOLERANCE {
            return None;
        }
        let body_handle = world.character(self.character_id)?.body_handle;
        let translation = world.translation(body_handle)?;

        let profile = ColliderProfile {
            half_height: target_half_height,
            radius: self.radius(),
        };
        if !world.swap_character_capsule(self.character_id, profile) {
            return None;
        }

        // Shrinking moves the body down, growing moves it up; bottom stays put.
        let shift = target_half_height - self.half_height;
        let mut moved = translation;
        moved.y += shift;
        world.set_translation(body_handle, moved);
        self.visual_offset_y -= shift;

        log::debug!(
            "[Capsule] Resized character {} half-height {:.3} -> {:.3}",
            self.character_id,
            self.half_height,
            target_half_height
        );
        self.half_height = target_half_height;
        Some(shift)
    }
}
