//! Fixed-size dust particle pool. Spawning always succeeds by reusing the
//! oldest slot once the ring wraps.

use nalgebra::{Point3, UnitQuaternion, Vector3};
use serde::Serialize;
use std::f32::consts::TAU;

use super::constants::particles as consts;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Particle {
    pub active: bool,
    pub position: Point3<f32>,
    pub velocity: Vector3<f32>,
    /// Surface normal the particle was emitted from
    pub normal: Vector3<f32>,
    pub scale: f32,
    /// Scale at emission; `scale` shrinks from here with remaining life
    pub initial_scale: f32,
    pub life: f32,
}

impl Particle {
    fn inactive() -> Self {
        Self {
            active: false,
            position: Point3::origin(),
            velocity: Vector3::zeros(),
            normal: Vector3::y(),
            scale: 0.0,
            initial_scale: 0.0,
            life: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParticlePool {
    slots: Vec<Particle>,
    next: usize,
}

impl Default for ParticlePool {
    fn default() -> Self {
        Self::new(consts::POOL_CAPACITY)
    }
}

impl ParticlePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Particle::inactive(); capacity.max(1)],
            next: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Particle] {
        &self.slots
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|p| p.active).count()
    }

    /// Emits one particle at a contact point. Steeper ground tilts the launch
    /// direction away from the normal and shrinks the puff. Returns the slot.
    pub fn spawn(&mut self, point: Point3<f32>, normal: Vector3<f32>, slope: f32) -> usize {
        let normal = normal.try_normalize(1.0e-6).unwrap_or_else(Vector3::y);
        let slope = slope.clamp(0.0, 1.0);
        let launch = (normal + Vector3::y() * (1.0 - slope))
            .try_normalize(1.0e-6)
            .unwrap_or_else(Vector3::y)
            * consts::LAUNCH_SPEED;
        self.emit(point, launch, normal, consts::BASE_SCALE * (1.0 - 0.5 * slope))
    }

    /// Emits `count` particles in a flat ring around `center`, used for landings.
    pub fn spawn_ring(&mut self, center: Point3<f32>, radius: f32, count: usize) -> Vec<usize> {
        (0..count)
            .map(|i| {
                let angle = TAU * i as f32 / count as f32;
                let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), angle);
                let outward = rotation * Vector3::x();
                let velocity = (outward + Vector3::y() * 0.5).normalize() * consts::LAUNCH_SPEED;
                self.emit(center + outward * radius, velocity, Vector3::y(), consts::BASE_SCALE)
            })
            .collect()
    }

    fn emit(&mut self, position: Point3<f32>, velocity: Vector3<f32>, normal: Vector3<f32>, scale: f32) -> usize {
        let slot = self.next;
        self.slots[slot] = Particle {
            active: true,
            position,
            velocity,
            normal,
            scale,
            initial_scale: scale,
            life: consts::LIFETIME,
        };
        self.next = (self.next + 1) % self.slots.len();
        slot
    }

    /// Integrates active particles and retires expired ones.
    pub fn update(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        let drag = (-consts::DRAG * dt).exp();
        for particle in self.slots.iter_mut().filter(|p| p.active) {
            particle.life -= dt;
            if particle.life <= 0.0 {
                *particle = Particle::inactive();
                continue;
            }
            particle.velocity.y -= consts::GRAVITY * dt;
            particle.velocity *= drag;
            particle.position += particle.velocity * dt;
            particle.scale = particle.initial_scale * (particle.life / consts::LIFETIME);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_wraps_around() {
        let mut pool = ParticlePool::default();
        let slots: Vec<usize> = (0..50)
            .map(|i| pool.spawn(Point3::new(i as f32, 0.0, 0.0), Vector3::y(), 0.0))
            .collect();
        assert_eq!(slots[47], 47);
        assert_eq!(slots[48], 0);
        assert_eq!(slots[49], 1);
        assert_eq!(pool.active_count(), 48);
        assert_eq!(pool.slots()[0].position.x, 48.0);
        assert_eq!(pool.slots()[1].position.x, 49.0);
        assert_eq!(pool.slots()[2].position.x, 2.0);
    }

    #[test]
    fn test_particles_expire() {
        let mut pool = ParticlePool::new(4);
        pool.spawn(Point3::origin(), Vector3::y(), 0.0);
        pool.update(0.3);
        let p = pool.slots()[0];
        assert!(p.active);
        assert!(p.position.y > 0.0);
        assert!(p.scale < consts::BASE_SCALE);
        pool.update(0.31);
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_landing_ring() {
        let mut pool = ParticlePool::default();
        let slots = pool.spawn_ring(Point3::new(0.0, 1.0, 0.0), 0.3, 6);
        assert_eq!(slots, vec![0, 1, 2, 3, 4, 5]);
        for p in &pool.slots()[..6] {
            let r = (p.position.x.powi(2) + p.position.z.powi(2)).sqrt();
            assert!((r - 0.3).abs() < 1e-5);
            assert_eq!(p.position.y, 1.0);
        }
    }

    #[test]
    fn test_slope_tilts_launch() {
        let mut pool = ParticlePool::default();
        let normal = Vector3::new(1.0, 1.0, 0.0).normalize();
        pool.spawn(Point3::origin(), normal, 0.3);
        let p = pool.slots()[0];
        assert!(p.velocity.x > 0.0);
        assert!((p.velocity.norm() - consts::LAUNCH_SPEED).abs() < 1e-5);
        assert!(p.scale < consts::BASE_SCALE);
    }

    #[test]
    fn test_slope_puff_only_shrinks() {
        let mut pool = ParticlePool::default();
        pool.spawn(Point3::origin(), Vector3::new(1.0, 0.2, 0.0), 0.8);
        let initial = pool.slots()[0].scale;
        assert!(initial < consts::BASE_SCALE);
        assert_eq!(pool.slots()[0].initial_scale, initial);

        let mut last = initial;
        for _ in 0..10 {
            pool.update(0.001);
            let scale = pool.slots()[0].scale;
            assert!(scale <= last, "scale grew from {} to {}", last, scale);
            last = scale;
        }
    }

    #[test]
    fn test_downward_normal_launches_up() {
        let mut pool = ParticlePool::default();
        pool.spawn(Point3::origin(), -Vector3::y(), 0.0);
        let p = pool.slots()[0];
        assert!(p.velocity.iter().all(|c| c.is_finite()));
        assert!((p.velocity.y - consts::LAUNCH_SPEED).abs() < 1e-5);
    }
}
