//! Controller configuration parsing from TOML files.
//!
//! The config is built once, validated, and then only read. The two values
//! that genuinely change at runtime (capsule half-height and the visual Y
//! offset) live on the capsule resizer, not here.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::game::bones::FootBoneMap;
use crate::game::constants::{animation, camera, capsule, footsteps, locomotion};

/// Capsule sizing section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapsuleConfig {
    /// Standing cylinder length (standing half-height is half of this)
    pub height: f32,
    pub radius: f32,
    /// Local Y of the visual model inside its container
    pub y_offset: f32,
}

impl Default for CapsuleConfig {
    fn default() -> Self {
        Self {
            height: capsule::DEFAULT_HEIGHT,
            radius: capsule::DEFAULT_RADIUS,
            y_offset: -(capsule::DEFAULT_HEIGHT / 2.0 + capsule::DEFAULT_RADIUS),
        }
    }
}

/// Movement speeds and per-frame smoothing factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub walk_speed: f32,
    pub run_speed: f32,
    pub roll_speed: f32,
    pub jump_force: f32,
    pub crouch_speed_factor: f32,
    pub turn_sensitivity: f32,
    pub idle_damping: f32,
    pub rotation_lerp: f32,
    /// Apply damping/lerp factors once per frame regardless of frame time
    pub frame_coupled: bool,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            walk_speed: locomotion::WALK_SPEED,
            run_speed: locomotion::RUN_SPEED,
            roll_speed: locomotion::ROLL_SPEED,
            jump_force: locomotion::JUMP_FORCE,
            crouch_speed_factor: locomotion::CROUCH_SPEED_FACTOR,
            turn_sensitivity: locomotion::TURN_SENSITIVITY,
            idle_damping: locomotion::IDLE_DAMPING,
            rotation_lerp: locomotion::ROTATION_LERP,
            frame_coupled: false,
        }
    }
}

/// Durations of timed states, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub stand_up_delay: f32,
    pub jump_start: f32,
    pub land: f32,
    pub roll: f32,
    pub crouch_transition: f32,
    pub attack: f32,
    pub animation_cooldown: f32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            stand_up_delay: locomotion::STAND_UP_DELAY,
            jump_start: locomotion::JUMP_START_DURATION,
            land: locomotion::LAND_DURATION,
            roll: locomotion::ROLL_DURATION,
            crouch_transition: locomotion::CROUCH_TRANSITION_DURATION,
            attack: locomotion::ATTACK_DURATION,
            animation_cooldown: locomotion::ANIMATION_CHANGE_COOLDOWN,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position_offset: [f32; 3],
    pub target_offset: [f32; 3],
    pub follow_lerp: f32,
    pub orbit_sensitivity: f32,
    pub pitch_limit_degrees: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position_offset: camera::POSITION_OFFSET,
            target_offset: camera::TARGET_OFFSET,
            follow_lerp: camera::FOLLOW_LERP,
            orbit_sensitivity: camera::ORBIT_SENSITIVITY,
            pitch_limit_degrees: camera::PITCH_LIMIT_DEGREES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FootstepConfig {
    /// Footstep clip names, picked at random without immediate repeats
    pub clips: Vec<String>,
    pub volume_run: f32,
    pub volume_walk: f32,
    pub volume_crouch: f32,
    pub volume_land: f32,
    pub cooldown_base: f32,
    pub cooldown_per_speed: f32,
    pub cooldown_floor_run: f32,
    pub cooldown_floor_walk: f32,
    /// Seed for clip selection
    pub seed: u64,
}

impl Default for FootstepConfig {
    fn default() -> Self {
        Self {
            clips: (1..=4).map(|i| format!("footstep_{:02}", i)).collect(),
            volume_run: footsteps::VOLUME_RUN,
            volume_walk: footsteps::VOLUME_WALK,
            volume_crouch: footsteps::VOLUME_CROUCH,
            volume_land: footsteps::VOLUME_LAND,
            cooldown_base: footsteps::COOLDOWN_BASE,
            cooldown_per_speed: footsteps::COOLDOWN_PER_SPEED,
            cooldown_floor_run: footsteps::COOLDOWN_FLOOR_RUN,
            cooldown_floor_walk: footsteps::COOLDOWN_FLOOR_WALK,
            seed: 0x5eed,
        }
    }
}

/// Animation clip names per locomotion key (`idle`, `walk`, `jump_start`, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub fade_in: f32,
    pub priority_fade_in: f32,
    /// Overrides keyed by the locomotion key name; missing keys use the key name
    pub clips: BTreeMap<String, String>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fade_in: animation::FADE_IN,
            priority_fade_in: animation::PRIORITY_FADE_IN,
            clips: BTreeMap::new(),
        }
    }
}

impl AnimationConfig {
    /// Clip name for a locomotion key name
    pub fn clip_for<'a>(&'a self, key_name: &'a str) -> &'a str {
        self.clips.get(key_name).map(String::as_str).unwrap_or(key_name)
    }
}

/// Full controller configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub capsule: CapsuleConfig,
    pub movement: MovementConfig,
    pub timing: TimingConfig,
    pub camera: CameraConfig,
    pub footsteps: FootstepConfig,
    pub bones: FootBoneMap,
    pub animations: AnimationConfig,
}

impl ControllerConfig {
    /// Load controller configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Rejects values the controller cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("capsule.height", self.capsule.height),
            ("capsule.radius", self.capsule.radius),
            ("movement.walk_speed", self.movement.walk_speed),
            ("movement.run_speed", self.movement.run_speed),
            ("timing.stand_up_delay", self.timing.stand_up_delay),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{} must be positive, got {}", name, value)));
            }
        }

        let unit = [
            ("movement.idle_damping", self.movement.idle_damping),
            ("movement.rotation_lerp", self.movement.rotation_lerp),
            ("camera.follow_lerp", self.camera.follow_lerp),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{} must be in [0, 1], got {}", name, value)));
            }
        }

        if self.footsteps.cooldown_floor_run > self.footsteps.cooldown_floor_walk {
            return Err(ConfigError::Invalid(
                "footsteps.cooldown_floor_run must not exceed cooldown_floor_walk".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors that can occur when loading controller configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = ControllerConfig::from_toml_str("").unwrap();
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.movement.jump_force, 6.0);
        assert_eq!(config.timing.stand_up_delay, 0.5);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
            [capsule]
            height = 1.2

            [movement]
            run_speed = 7.5
            frame_coupled = true

            [bones]
            left = ["ankle.L"]

            [animations.clips]
            idle = "Idle_Breathing"
        "#;
        let config = ControllerConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.capsule.height, 1.2);
        assert_eq!(config.capsule.radius, capsule::DEFAULT_RADIUS);
        assert_eq!(config.movement.run_speed, 7.5);
        assert!(config.movement.frame_coupled);
        assert_eq!(config.bones.left, vec!["ankle.L".to_string()]);
        assert_eq!(config.bones.right, FootBoneMap::default().right);
        assert_eq!(config.animations.clip_for("idle"), "Idle_Breathing");
        assert_eq!(config.animations.clip_for("walk"), "walk");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = ControllerConfig::from_toml_str("[capsule]\nradius = 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = ControllerConfig::from_toml_str("[movement]\nidle_damping = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("idle_damping"));
    }

    #[test]
    fn test_parse_error_mentions_source() {
        let err = ControllerConfig::from_toml_str("[movement]\nwalk_speed = \"fast\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_, _)));
        assert!(err.to_string().contains("<inline>"));
    }

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let text = ControllerConfig::default().to_toml_string().unwrap();
        let parsed = ControllerConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, ControllerConfig::default());
    }
}
