//! Fire-and-forget effect output: footstep audio cues and dust particles.
//!
//! Audio cues leave the frame loop over a crossbeam channel. Whoever owns the
//! receiver (a mixer thread, the CLI, a test) drains it at its own pace; a
//! dropped receiver only silences audio.

use crossbeam_channel::{Receiver, Sender};
use nalgebra::Point3;
use serde::Serialize;

use super::constants::footsteps as consts;
use super::footsteps::FootstepEvent;
use super::particles::ParticlePool;

/// Sound request sent to the audio consumer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AudioCue {
    pub clip: String,
    pub volume: f32,
    pub position: Point3<f32>,
}

/// Receives the character's audible and visible effects.
pub trait EffectSink {
    /// A footstep sound at `at`, plus one dust puff per contact in the event.
    fn footstep(&mut self, event: &FootstepEvent, at: Point3<f32>);
    /// Landing dust ring around the capsule bottom.
    fn landing(&mut self, center: Point3<f32>, radius: f32);
}

pub struct EffectRouter {
    particles: ParticlePool,
    audio_tx: Option<Sender<AudioCue>>,
    cues_sent: u64,
    audio_closed: bool,
}

impl EffectRouter {
    pub fn new(audio_tx: Option<Sender<AudioCue>>) -> Self {
        Self {
            particles: ParticlePool::default(),
            audio_tx,
            cues_sent: 0,
            audio_closed: false,
        }
    }

    /// Router paired with a fresh unbounded audio channel
    pub fn with_channel() -> (Self, Receiver<AudioCue>) {
        let (audio_tx, audio_rx) = crossbeam_channel::unbounded::<AudioCue>();
        (Self::new(Some(audio_tx)), audio_rx)
    }

    pub fn particles(&self) -> &ParticlePool {
        &self.particles
    }

    pub fn cues_sent(&self) -> u64 {
        self.cues_sent
    }

    /// Advances particle simulation
    pub fn update(&mut self, dt: f32) {
        self.particles.update(dt);
    }

    fn send(&mut self, cue: AudioCue) {
        let Some(tx) = &self.audio_tx else {
            return;
        };
        match tx.send(cue) {
            Ok(()) => self.cues_sent += 1,
            Err(_) => {
                // Receiver dropped; stop trying.
                if !self.audio_closed {
                    log::debug!("[Effects] Audio receiver closed, cues dropped from now on");
                    self.audio_closed = true;
                }
                self.audio_tx = None;
            }
        }
    }
}

impl Default for EffectRouter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl EffectSink for EffectRouter {
    fn footstep(&mut self, event: &FootstepEvent, at: Point3<f32>) {
        if let Some(clip) = &event.clip {
            self.send(AudioCue {
                clip: clip.clone(),
                volume: event.volume,
                position: at,
            });
        }
        for contact in &event.contacts {
            self.particles.spawn(contact.point, contact.normal, contact.slope);
        }
    }

    fn landing(&mut self, center: Point3<f32>, radius: f32) {
        self.particles.spawn_ring(center, radius, consts::LANDING_BURST);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::bones::Foot;
    use crate::game::footsteps::{FootContact, Gait};
    use nalgebra::Vector3;

    fn event(contacts: usize) -> FootstepEvent {
        FootstepEvent {
            clip: Some("footstep_02".to_string()),
            volume: 0.8,
            gait: Gait::Run,
            contacts: (0..contacts)
                .map(|i| FootContact {
                    foot: Foot::BOTH[i % 2],
                    point: Point3::new(i as f32, 0.0, 0.0),
                    normal: Vector3::y(),
                    slope: 0.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_footstep_sends_cue_and_spawns_per_contact() {
        let (mut router, audio_rx) = EffectRouter::with_channel();
        router.footstep(&event(2), Point3::new(1.0, 0.0, 2.0));

        let cue = audio_rx.try_recv().unwrap();
        assert_eq!(cue.clip, "footstep_02");
        assert_eq!(cue.volume, 0.8);
        assert_eq!(cue.position, Point3::new(1.0, 0.0, 2.0));
        assert!(audio_rx.try_recv().is_err());
        assert_eq!(router.particles().active_count(), 2);
        assert_eq!(router.cues_sent(), 1);
    }

    #[test]
    fn test_clipless_step_still_spawns_particles() {
        let (mut router, audio_rx) = EffectRouter::with_channel();
        let mut silent = event(2);
        silent.clip = None;
        router.footstep(&silent, Point3::origin());

        assert!(audio_rx.try_recv().is_err());
        assert_eq!(router.cues_sent(), 0);
        assert_eq!(router.particles().active_count(), 2);
    }

    #[test]
    fn test_landing_burst() {
        let mut router = EffectRouter::default();
        router.landing(Point3::origin(), 0.3);
        assert_eq!(router.particles().active_count(), consts::LANDING_BURST);
    }

    #[test]
    fn test_dropped_receiver_is_tolerated() {
        let (mut router, audio_rx) = EffectRouter::with_channel();
        drop(audio_rx);
        router.footstep(&event(1), Point3::origin());
        router.footstep(&event(1), Point3::origin());
        assert_eq!(router.cues_sent(), 0);
        assert_eq!(router.particles().active_count(), 2);
    }
}
