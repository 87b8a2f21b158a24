//! Foot-contact driven footstep events.
//!
//! Each foot keeps its last world position and grounded flag. A step fires on
//! the rising edge of foot contact, only when the shared cooldown has run out
//! and the foot actually moved into the ground (one of the motion heuristics
//! holds). Both feet landing in the same frame produce one sound and one
//! contact per foot.

use nalgebra::{Point3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use super::bones::Foot;
use super::constants::footsteps as consts;
use super::contact_sensor::{ContactSensor, FootHit};
use super::physics::RayQuery;
use crate::config::FootstepConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gait {
    Walk,
    Run,
    Crouch,
    Land,
}

impl Gait {
    pub fn volume(self, config: &FootstepConfig) -> f32 {
        match self {
            Gait::Walk => config.volume_walk,
            Gait::Run => config.volume_run,
            Gait::Crouch => config.volume_crouch,
            Gait::Land => config.volume_land,
        }
    }
}

/// Contact threshold for a hit, looser on steep ground
pub fn contact_threshold(slope: f32) -> f32 {
    if slope > consts::STEEP_SLOPE {
        consts::SLOPE_CONTACT_THRESHOLD
    } else {
        consts::FLAT_CONTACT_THRESHOLD
    }
}

/// Cooldown after a step; shorter at speed, never below the gait's floor.
pub fn step_cooldown(speed: f32, running: bool, config: &FootstepConfig) -> f32 {
    let floor = if running {
        config.cooldown_floor_run
    } else {
        config.cooldown_floor_walk
    };
    (config.cooldown_base - speed.max(0.0) * config.cooldown_per_speed).max(floor)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FootContact {
    pub foot: Foot,
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    pub slope: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FootstepEvent {
    /// Sound to play; `None` when no clips are configured
    pub clip: Option<String>,
    pub volume: f32,
    pub gait: Gait,
    /// Feet that touched down this frame; empty for a forced landing step
    pub contacts: Vec<FootContact>,
}

/// Per-foot motion since the previous sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FootSample {
    pub grounded: bool,
    pub rising_edge: bool,
    pub vertical_velocity: f32,
    pub vertical_delta: f32,
    pub lateral_delta: f32,
    pub hit: Option<FootHit>,
}

impl FootSample {
    /// The foot is moving into the ground rather than sitting still while the
    /// ground changes under it.
    pub fn has_step_motion(&self) -> bool {
        let slope = self.hit.map(|h| h.slope).unwrap_or(0.0);
        self.vertical_velocity < consts::DOWNWARD_VELOCITY
            || self.vertical_delta.abs() > consts::VERTICAL_DELTA
            || slope > consts::SLOPE_TRIGGER
            || self.lateral_delta > consts::LATERAL_DELTA
    }
}

#[derive(Debug, Clone, Default)]
pub struct FootContactTrack {
    last_position: Option<Vector3<f32>>,
    grounded: bool,
}

impl FootContactTrack {
    pub fn is_grounded(&self) -> bool {
        self.grounded
    }

    /// Records this frame's foot position and ray result. The first sample
    /// only seeds the track and never reports an edge.
    pub fn sample(&mut self, position: Vector3<f32>, hit: Option<FootHit>, dt: f32) -> FootSample {
        let grounded = hit.is_some_and(|h| h.toi < contact_threshold(h.slope));
        let (vertical_delta, lateral_delta, rising_edge) = match self.last_position {
            Some(last) => {
                let delta = position - last;
                (delta.y, delta.x.hypot(delta.z), grounded && !self.grounded)
            }
            None => (0.0, 0.0, false),
        };
        let vertical_velocity = if dt > 0.0 { vertical_delta / dt } else { 0.0 };

        self.last_position = Some(position);
        self.grounded = grounded;
        FootSample {
            grounded,
            rising_edge,
            vertical_velocity,
            vertical_delta,
            lateral_delta,
            hit,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

pub struct FootstepTrigger {
    tracks: [FootContactTrack; 2],
    cooldown: f32,
    last_clip: Option<usize>,
    rng: StdRng,
}

impl FootstepTrigger {
    pub fn new(seed: u64) -> Self {
        Self {
            tracks: [FootContactTrack::default(), FootContactTrack::default()],
            cooldown: 0.0,
            last_clip: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn cooldown(&self) -> f32 {
        self.cooldown
    }

    pub fn track(&self, foot: Foot) -> &FootContactTrack {
        &self.tracks[foot.index()]
    }

    /// Samples both feet. `feet` holds each foot bone's world position, or
    /// `None` when that foot has no resolved bone.
    #[allow(clippy::too_many_arguments)]
    pub fn update<Q: RayQuery + ?Sized>(
        &mut self,
        sensor: &ContactSensor,
        rays: &Q,
        feet: [Option<Vector3<f32>>; 2],
        gait: Gait,
        speed: f32,
        dt: f32,
        config: &FootstepConfig,
    ) -> Option<FootstepEvent> {
        self.cooldown = (self.cooldown - dt.max(0.0)).max(0.0);

        let mut contacts = Vec::new();
        for foot in Foot::BOTH {
            let Some(position) = feet[foot.index()] else {
                continue;
            };
            let hit = sensor.foot_contact(rays, position);
            let sample = self.tracks[foot.index()].sample(position, hit, dt);
            if !(sample.rising_edge && sample.has_step_motion()) {
                continue;
            }
            if let Some(hit) = sample.hit {
                contacts.push(FootContact {
                    foot,
                    point: hit.point,
                    normal: hit.normal,
                    slope: hit.slope,
                });
            }
        }

        if contacts.is_empty() || self.cooldown > 0.0 {
            return None;
        }
        self.cooldown = step_cooldown(speed, gait == Gait::Run, config);
        let clip = self.pick_clip(&config.clips);
        log::debug!("[Footsteps] {:?} step on {} foot(s)", gait, contacts.len());
        Some(FootstepEvent {
            clip,
            volume: gait.volume(config),
            gait,
            contacts,
        })
    }

    /// Step that bypasses edge detection and cooldown, used on landing. Resets
    /// the cooldown as a normal step would.
    pub fn force_step(&mut self, gait: Gait, speed: f32, config: &FootstepConfig) -> FootstepEvent {
        self.cooldown = step_cooldown(speed, gait == Gait::Run, config);
        FootstepEvent {
            clip: self.pick_clip(&config.clips),
            volume: gait.volume(config),
            gait,
            contacts: Vec::new(),
        }
    }

    /// Forgets foot history so the next sample only seeds each track.
    pub fn reset_tracks(&mut self) {
        for track in &mut self.tracks {
            track.reset();
        }
    }

    fn pick_clip(&mut self, clips: &[String]) -> Option<String> {
        let index = match clips.len() {
            0 => return None,
            1 => 0,
            n => match self.last_clip {
                Some(last) => {
                    let pick = self.rng.gen_range(0..n - 1);
                    if pick >= last {
                        pick + 1
                    } else {
                        pick
                    }
                }
                None => self.rng.gen_range(0..n),
            },
        };
        self.last_clip = Some(index);
        clips.get(index).cloned()
    }
}
