//! Tuning for a level session.
//!
//! Every field has a default, so `{}` is a valid config and partial JSON only
//! overrides what it names.

use serde::{Deserialize, Serialize};

use crate::physics::PHYSICS_DT;

/// Errors raised while loading a [`SessionConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid session config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f32 },
}

/// World-level physics settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    #[serde(default = "default_gravity")]
    pub gravity: [f32; 2],
    #[serde(default = "default_dt")]
    pub dt: f32,
}

fn default_gravity() -> [f32; 2] {
    [0.0, -25.0]
}

fn default_dt() -> f32 {
    PHYSICS_DT
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            dt: default_dt(),
        }
    }
}

/// Player body shape and control tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_body_half_extents")]
    pub body_half_extents: [f32; 2],
    #[serde(default = "default_foot_half_extents")]
    pub foot_half_extents: [f32; 2],
    /// Vertical offset of the foot sensor centre from the body centre.
    #[serde(default = "default_foot_offset")]
    pub foot_offset: f32,
    #[serde(default = "default_friction")]
    pub friction: f32,
    #[serde(default = "default_walk_speed")]
    pub walk_speed: f32,
    #[serde(default = "default_climb_speed")]
    pub climb_speed: f32,
    #[serde(default = "default_jump_impulse")]
    pub jump_impulse: f32,
    /// Minimum number of frames between two jumps.
    #[serde(default = "default_jump_cooldown_frames")]
    pub jump_cooldown_frames: u64,
    /// Entities underfoot are pushed back by the walking impulse divided by this.
    #[serde(default = "default_entity_kickback_divisor")]
    pub entity_kickback_divisor: f32,
    /// Falling below this height kills the player.
    #[serde(default = "default_fall_limit_y")]
    pub fall_limit_y: f32,
}

fn default_body_half_extents() -> [f32; 2] {
    [0.48, 0.48]
}

fn default_foot_half_extents() -> [f32; 2] {
    [0.38, 0.1]
}

fn default_foot_offset() -> f32 {
    -0.48
}

fn default_friction() -> f32 {
    0.01
}

fn default_walk_speed() -> f32 {
    5.0
}

fn default_climb_speed() -> f32 {
    5.0
}

fn default_jump_impulse() -> f32 {
    10.0
}

fn default_jump_cooldown_frames() -> u64 {
    12
}

fn default_entity_kickback_divisor() -> f32 {
    13.0
}

fn default_fall_limit_y() -> f32 {
    -40.0
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            body_half_extents: default_body_half_extents(),
            foot_half_extents: default_foot_half_extents(),
            foot_offset: default_foot_offset(),
            friction: default_friction(),
            walk_speed: default_walk_speed(),
            climb_speed: default_climb_speed(),
            jump_impulse: default_jump_impulse(),
            jump_cooldown_frames: default_jump_cooldown_frames(),
            entity_kickback_divisor: default_entity_kickback_divisor(),
            fall_limit_y: default_fall_limit_y(),
        }
    }
}

/// Complete session configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

impl SessionConfig {
    /// Loads and validates a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Checks that every size, speed and divisor is strictly positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let player = &self.player;
        let checks = [
            ("physics.dt", self.physics.dt),
            ("player.body_half_extents[0]", player.body_half_extents[0]),
            ("player.body_half_extents[1]", player.body_half_extents[1]),
            ("player.foot_half_extents[0]", player.foot_half_extents[0]),
            ("player.foot_half_extents[1]", player.foot_half_extents[1]),
            ("player.walk_speed", player.walk_speed),
            ("player.climb_speed", player.climb_speed),
            ("player.jump_impulse", player.jump_impulse),
            ("player.entity_kickback_divisor", player.entity_kickback_divisor),
        ];
        for (name, value) in checks {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        Ok(())
    }
}
