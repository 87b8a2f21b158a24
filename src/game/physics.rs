use nalgebra::{Point3, Vector3};
use rapier3d::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

use super::capsule::ColliderProfile;
use super::constants::physics as consts;

// Characters collide with static geometry only, never with each other.
// Note: rapier3d uses InteractionGroups (not CollisionGroups like bevy_rapier)
const GROUP_STATIC: Group = Group::GROUP_1; // Floors, walls, ceilings
const GROUP_CHARACTER: Group = Group::GROUP_2; // Player capsules

/// Canonical ray hit. Every query is normalized into this once, at the boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance along the (normalized) ray direction
    pub toi: f32,
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RayQueryError {
    #[error("ray origin or direction is not finite")]
    NonFinite,
    #[error("ray direction has zero length")]
    ZeroDirection,
}

/// Raycast seam between the contact logic and whatever answers the queries.
pub trait RayQuery {
    /// Casts a ray and returns the closest hit within `max_len`, skipping `exclude`.
    fn cast_ray(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_len: f32,
        exclude: Option<RigidBodyHandle>,
    ) -> Result<Option<RayHit>, RayQueryError>;
}

/// Body and active collider of one spawned character.
#[derive(Debug, Clone, Copy)]
pub struct CharacterBody {
    pub body_handle: RigidBodyHandle,
    pub collider_handle: ColliderHandle,
    pub profile: ColliderProfile,
}

/// Wrapper around the Rapier3D pipeline the character controller runs against.
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    /// Static level geometry by block id
    pub blocks: HashMap<u64, RigidBodyHandle>,
    /// Dynamic character bodies by entity id
    pub characters: HashMap<u64, CharacterBody>,
}

fn build_capsule(profile: ColliderProfile) -> Collider {
    ColliderBuilder::capsule_y(profile.half_height, profile.radius)
        .friction(consts::CAPSULE_FRICTION)
        .restitution(consts::CAPSULE_RESTITUTION)
        .collision_groups(InteractionGroups::new(GROUP_CHARACTER, GROUP_STATIC))
        .build()
}

impl PhysicsWorld {
    /// Creates a new physics world with fixed gravity and a 60 Hz step
    pub fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = consts::TIMESTEP;
        Self {
            gravity: vector![0.0, -consts::GRAVITY, 0.0],
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            blocks: HashMap::new(),
            characters: HashMap::new(),
        }
    }

    /// Advances the simulation by exactly one fixed increment
    pub fn step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Rebuilds the query acceleration structure after colliders changed outside a step
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Adds a static axis-aligned box (floor, wall, ceiling)
    pub fn add_block(&mut self, id: u64, center: [f32; 3], size: [f32; 3]) -> RigidBodyHandle {
        if let Some(&existing) = self.blocks.get(&id) {
            log::warn!("[Physics] Block {} already present, keeping existing body", id);
            return existing;
        }
        let body = RigidBodyBuilder::fixed()
            .translation(vector![center[0], center[1], center[2]])
            .build();
        let handle = self.rigid_body_set.insert(body);
        let collider = ColliderBuilder::cuboid(size[0] / 2.0, size[1] / 2.0, size[2] / 2.0)
            .collision_groups(InteractionGroups::new(GROUP_STATIC, Group::ALL))
            .build();
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        self.blocks.insert(id, handle);
        handle
    }

    /// Removes a static block
    pub fn remove_block(&mut self, id: u64) -> bool {
        let Some(handle) = self.blocks.remove(&id) else {
            return false;
        };
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        true
    }

    /// Spawns the dynamic capsule body for a character.
    /// Returns `None` (and logs) when the entity already has physics attached.
    pub fn attach_character(
        &mut self,
        id: u64,
        position: [f32; 3],
        profile: ColliderProfile,
    ) -> Option<RigidBodyHandle> {
        if self.characters.contains_key(&id) {
            log::warn!("[Physics] Character {} already has a rigid body, attach skipped", id);
            return None;
        }

        // Yaw stays free for the body; facing is applied to the visual container.
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position[0], position[1], position[2]])
            .enabled_rotations(false, true, false)
            .can_sleep(false)
            .build();
        let body_handle = self.rigid_body_set.insert(body);
        let collider_handle = self.collider_set.insert_with_parent(
            build_capsule(profile),
            body_handle,
            &mut self.rigid_body_set,
        );

        self.characters.insert(
            id,
            CharacterBody {
                body_handle,
                collider_handle,
                profile,
            },
        );
        Some(body_handle)
    }

    /// Removes a character body together with its collider
    pub fn detach_character(&mut self, id: u64) -> bool {
        let Some(character) = self.characters.remove(&id) else {
            return false;
        };
        self.rigid_body_set.remove(
            character.body_handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        true
    }

    pub fn character(&self, id: u64) -> Option<&CharacterBody> {
        self.characters.get(&id)
    }

    /// Replaces the character's capsule. The new collider is attached before the
    /// old one is removed so the body is never left without a collider.
    pub fn swap_character_capsule(&mut self, id: u64, profile: ColliderProfile) -> bool {
        let Some(character) = self.characters.get(&id).copied() else {
            return false;
        };
        if self.rigid_body_set.get(character.body_handle).is_none() {
            return false;
        }

        let new_handle = self.collider_set.insert_with_parent(
            build_capsule(profile),
            character.body_handle,
            &mut self.rigid_body_set,
        );
        self.collider_set.remove(
            character.collider_handle,
            &mut self.island_manager,
            &mut self.rigid_body_set,
            true,
        );

        if let Some(entry) = self.characters.get_mut(&id) {
            entry.collider_handle = new_handle;
            entry.profile = profile;
        }
        true
    }

    /// Number of colliders attached to a body
    pub fn collider_count(&self, handle: RigidBodyHandle) -> usize {
        self.rigid_body_set
            .get(handle)
            .map(|body| body.colliders().len())
            .unwrap_or(0)
    }

    pub fn translation(&self, handle: RigidBodyHandle) -> Option<Vector3<f32>> {
        self.rigid_body_set.get(handle).map(|body| *body.translation())
    }

    pub fn set_translation(&mut self, handle: RigidBodyHandle, translation: Vector3<f32>) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_translation(translation, true);
        }
    }

    pub fn linvel(&self, handle: RigidBodyHandle) -> Option<Vector3<f32>> {
        self.rigid_body_set.get(handle).map(|body| *body.linvel())
    }

    /// Sets the velocity of a dynamic body
    pub fn set_linvel(&mut self, handle: RigidBodyHandle, velocity: Vector3<f32>) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            if body.is_dynamic() {
                body.set_linvel(velocity, true);
            }
        }
    }
}

impl RayQuery for PhysicsWorld {
    fn cast_ray(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        max_len: f32,
        exclude: Option<RigidBodyHandle>,
    ) -> Result<Option<RayHit>, RayQueryError> {
        if !origin.coords.iter().all(|c| c.is_finite())
            || !direction.iter().all(|c| c.is_finite())
            || !max_len.is_finite()
        {
            return Err(RayQueryError::NonFinite);
        }
        let length = direction.norm();
        if length < consts::EPSILON {
            return Err(RayQueryError::ZeroDirection);
        }

        let ray = Ray::new(origin, direction / length);
        let mut filter = QueryFilter::default().exclude_sensors();
        if let Some(body_handle) = exclude {
            filter = filter.exclude_rigid_body(body_handle);
        }

        let hit = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_len,
            true, // solid
            filter,
        );

        Ok(hit.map(|(_, intersection)| RayHit {
            toi: intersection.time_of_impact,
            point: ray.point_at(intersection.time_of_impact),
            normal: intersection.normal,
        }))
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
