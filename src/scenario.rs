//! Scripted headless runs: a level of static blocks, a spawn point and a
//! timeline of held inputs.
//!
//! ```toml
//! fps = 60.0
//! duration = 2.0
//! spawn = [0.0, 0.0, 0.0]
//!
//! [[block]]
//! center = [0.0, -0.5, 0.0]
//! size = [40.0, 1.0, 40.0]
//!
//! [[segment]]
//! start = 0.5
//! end = 1.0
//! input = { forward = true, run = true }
//! ```

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::ControllerConfig;
use crate::game::input::InputState;
use crate::game::session::{FrameReport, Session};

/// Entity id of the scenario's character
pub const CHARACTER_ID: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSpec {
    pub center: [f32; 3],
    pub size: [f32; 3],
}

/// Input held from `start` (inclusive) to `end` (exclusive), in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSegment {
    pub start: f32,
    pub end: f32,
    #[serde(default)]
    pub input: InputState,
}

impl InputSegment {
    pub fn is_active(&self, time: f32) -> bool {
        time >= self.start && time < self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub fps: f32,
    pub duration: f32,
    /// Where the capsule bottom starts
    pub spawn: [f32; 3],
    /// Bone names of the character's skeleton
    pub skeleton: Vec<String>,
    #[serde(rename = "block")]
    pub blocks: Vec<BlockSpec>,
    #[serde(rename = "segment")]
    pub segments: Vec<InputSegment>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            fps: 60.0,
            duration: 1.0,
            spawn: [0.0, 0.0, 0.0],
            skeleton: ["Hips", "mixamorigLeftFoot", "mixamorigRightFoot"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            blocks: vec![BlockSpec {
                center: [0.0, -0.5, 0.0],
                size: [40.0, 1.0, 40.0],
            }],
            segments: Vec::new(),
        }
    }
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScenarioError::Io(path.to_path_buf(), e))?;
        let scenario: Self =
            toml::from_str(&content).map_err(|e| ScenarioError::Parse(path.to_path_buf(), e))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = toml::from_str(content)
            .map_err(|e| ScenarioError::Parse(PathBuf::from("<inline>"), e))?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(ScenarioError::Invalid(format!("fps must be positive, got {}", self.fps)));
        }
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return Err(ScenarioError::Invalid(format!(
                "duration must be non-negative, got {}",
                self.duration
            )));
        }
        for (i, segment) in self.segments.iter().enumerate() {
            if segment.end < segment.start {
                return Err(ScenarioError::Invalid(format!(
                    "segment {} ends ({}) before it starts ({})",
                    i, segment.end, segment.start
                )));
            }
        }
        for (i, block) in self.blocks.iter().enumerate() {
            if block.size.iter().any(|s| !(s.is_finite() && *s > 0.0)) {
                return Err(ScenarioError::Invalid(format!("block {} has a non-positive size", i)));
            }
        }
        Ok(())
    }

    pub fn frame_count(&self) -> u64 {
        (self.duration * self.fps).round() as u64
    }

    pub fn frame_dt(&self) -> f32 {
        1.0 / self.fps
    }

    /// Union of every segment active at `time`. Pointer motion adds up.
    pub fn input_at(&self, time: f32) -> InputState {
        let mut merged = InputState::default();
        for segment in self.segments.iter().filter(|s| s.is_active(time)) {
            let input = &segment.input;
            merged.forward |= input.forward;
            merged.backward |= input.backward;
            merged.left |= input.left;
            merged.right |= input.right;
            merged.run |= input.run;
            merged.jump |= input.jump;
            merged.crouch |= input.crouch;
            merged.dance |= input.dance;
            merged.roll |= input.roll;
            merged.combat |= input.combat;
            merged.orbit |= input.orbit;
            merged.pointer_pressed |= input.pointer_pressed;
            merged.pointer_delta[0] += input.pointer_delta[0];
            merged.pointer_delta[1] += input.pointer_delta[1];
        }
        merged
    }

    /// Builds the level and spawns the character.
    pub fn build_session(&self, config: &ControllerConfig) -> Result<Session, ScenarioError> {
        let mut session = Session::new();
        for (id, block) in self.blocks.iter().enumerate() {
            session.add_block(id as u64, block.center, block.size);
        }
        let spawn = Vector3::from(self.spawn);
        if !session.spawn_character(CHARACTER_ID, spawn, config.clone(), &self.skeleton) {
            return Err(ScenarioError::Invalid("character could not be spawned".to_string()));
        }
        Ok(session)
    }

    /// Runs the whole timeline, handing each frame's report to `on_frame`.
    pub fn run<F>(&self, config: &ControllerConfig, mut on_frame: F) -> Result<Session, ScenarioError>
    where
        F: FnMut(&FrameReport),
    {
        let mut session = self.build_session(config)?;
        let dt = self.frame_dt();
        for frame in 0..self.frame_count() {
            let input = self.input_at(frame as f32 * dt);
            let report = session.frame(&input, dt);
            on_frame(&report);
        }
        Ok(session)
    }
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Invalid scenario: {0}")]
    Invalid(String),
}
