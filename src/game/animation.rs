//! Clip playback with linear cross-fades.

use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnimationError {
    #[error("Unknown animation clip: {0}")]
    UnknownClip(String),
}

/// Playback surface the character drives. A renderer binding implements this
/// for its own skeleton; `AnimationMixer` is the headless implementation.
pub trait AnimationPlayer {
    fn has_clip(&self, clip: &str) -> bool;
    /// Starts `clip`, cross-fading every other track out over `fade_in` seconds.
    fn play(&mut self, clip: &str, fade_in: f32) -> Result<(), AnimationError>;
    fn advance(&mut self, dt: f32);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    pub length: f32,
    pub looped: bool,
}

#[derive(Debug, Clone)]
struct Track {
    clip: String,
    length: f32,
    looped: bool,
    time_position: f32,
    is_playing: bool,
    weight_current: f32,
    fade_from: f32,
    fade_to: f32,
    fade_duration: f32,
    fade_elapsed: f32,
}

impl Track {
    fn new(clip: &str, info: &ClipInfo) -> Self {
        Self {
            clip: clip.to_string(),
            length: info.length.max(0.01),
            looped: info.looped,
            time_position: 0.0,
            is_playing: true,
            weight_current: 0.0,
            fade_from: 0.0,
            fade_to: 0.0,
            fade_duration: 0.0,
            fade_elapsed: 0.0,
        }
    }

    fn fade(&mut self, to: f32, duration: f32) {
        if duration <= 0.0 {
            self.weight_current = to;
            self.fade_to = to;
            self.fade_duration = 0.0;
            self.fade_elapsed = 0.0;
            return;
        }
        self.fade_from = self.weight_current;
        self.fade_to = to;
        self.fade_duration = duration;
        self.fade_elapsed = 0.0;
    }

    fn tick(&mut self, dt: f32) {
        if self.fade_duration > 0.0 {
            self.fade_elapsed = (self.fade_elapsed + dt).min(self.fade_duration);
            let alpha = (self.fade_elapsed / self.fade_duration).clamp(0.0, 1.0);
            self.weight_current = self.fade_from + (self.fade_to - self.fade_from) * alpha;
            if (self.fade_duration - self.fade_elapsed).abs() <= f32::EPSILON {
                self.fade_duration = 0.0;
                self.fade_elapsed = 0.0;
                self.weight_current = self.fade_to;
            }
        }
        self.weight_current = self.weight_current.max(0.0);

        if self.is_playing {
            self.time_position += dt;
            if self.time_position >= self.length {
                if self.looped {
                    self.time_position %= self.length;
                } else {
                    // Non-looping clips hold their last pose.
                    self.time_position = self.length;
                    self.is_playing = false;
                }
            }
        }
    }

    fn faded_out(&self) -> bool {
        self.fade_to <= 0.0 && self.weight_current <= 0.0001
    }
}

/// Headless mixer: named clips, one track per playing clip.
#[derive(Debug, Clone, Default)]
pub struct AnimationMixer {
    clips: HashMap<String, ClipInfo>,
    tracks: Vec<Track>,
    current: Option<String>,
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clips<I, S>(clips: I) -> Self
    where
        I: IntoIterator<Item = (S, ClipInfo)>,
        S: Into<String>,
    {
        let mut mixer = Self::new();
        for (name, info) in clips {
            mixer.add_clip(name, info);
        }
        mixer
    }

    pub fn add_clip(&mut self, name: impl Into<String>, info: ClipInfo) {
        self.clips.insert(name.into(), info);
    }

    /// Clip most recently started
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Active tracks and their normalized blend weights
    pub fn weights(&self) -> Vec<(&str, f32)> {
        let total: f32 = self.tracks.iter().map(|t| t.weight_current).sum();
        self.tracks
            .iter()
            .map(|t| {
                let w = if total > 0.0 { t.weight_current / total } else { 0.0 };
                (t.clip.as_str(), w)
            })
            .collect()
    }

    pub fn time_position(&self, clip: &str) -> Option<f32> {
        self.tracks
            .iter()
            .find(|t| t.clip == clip)
            .map(|t| t.time_position)
    }
}

impl AnimationPlayer for AnimationMixer {
    fn has_clip(&self, clip: &str) -> bool {
        self.clips.contains_key(clip)
    }

    fn play(&mut self, clip: &str, fade_in: f32) -> Result<(), AnimationError> {
        let info = self
            .clips
            .get(clip)
            .ok_or_else(|| AnimationError::UnknownClip(clip.to_string()))?;
        let fade_in = fade_in.max(0.0);

        for track in self.tracks.iter_mut().filter(|t| t.clip != clip) {
            track.fade(0.0, fade_in);
        }
        match self.tracks.iter_mut().find(|t| t.clip == clip) {
            Some(track) => {
                track.time_position = 0.0;
                track.is_playing = true;
                track.fade(1.0, fade_in);
            }
            None => {
                let mut track = Track::new(clip, info);
                track.fade(1.0, fade_in);
                self.tracks.push(track);
            }
        }
        self.current = Some(clip.to_string());
        Ok(())
    }

    fn advance(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        for track in &mut self.tracks {
            track.tick(dt);
        }
        self.tracks.retain(|t| !t.faded_out());
    }
}
