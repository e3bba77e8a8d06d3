//! Engine configuration
//!
//! Everything that used to be a compile-time constant lives here, with the
//! old values as defaults. Stored as RON; every field is optional in the file.
//!
//! ```ron
//! (
//!     physics: (timestep: 0.016666668, velocity_iterations: 8, position_iterations: 3),
//!     gravity: (increment: 9.8, max: 100.0),
//!     velocity_cap: (enabled: true, soft: false, max_x: 100.0, max_y: 100.0),
//! )
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::math::Vec2;

/// Top-level configuration for one engine instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub window: WindowConfig,
    pub render: RenderConfig,
    pub physics: PhysicsConfig,
    pub gravity: GravityConfig,
    pub velocity_cap: VelocityCapConfig,
    /// Material used by every hitbox whose definition does not override it
    pub material: FixtureMaterial,
    /// Whether more than one engine may be alive at the same time
    pub allow_multiple_instances: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            render: RenderConfig::default(),
            physics: PhysicsConfig::default(),
            gravity: GravityConfig::default(),
            velocity_cap: VelocityCapConfig::default(),
            material: FixtureMaterial::default(),
            allow_multiple_instances: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: u32,
    pub height: u32,
    pub title: String,
    pub fullscreen: bool,
    pub framerate: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            title: "GAME ENGINE".to_string(),
            fullscreen: false,
            framerate: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// World units to pixels
    pub scale: f32,
    /// Draw hitbox outlines on top of every physical entity
    pub show_hitboxes: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: 32.0,
            show_hitboxes: cfg!(debug_assertions),
        }
    }
}

/// Fixed-step solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Seconds per step
    pub timestep: f32,
    pub velocity_iterations: usize,
    pub position_iterations: usize,
    /// Constant gravity applied by the solver itself (y grows downward)
    #[serde(with = "crate::math::serde_vec2")]
    pub world_gravity: Vec2,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            timestep: 1.0 / 60.0,
            velocity_iterations: 8,
            position_iterations: 3,
            world_gravity: Vec2::new(0.0, 5.0),
        }
    }
}

/// Per-entity gravity ramp applied during the pre-step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravityConfig {
    /// Added to the accumulated strength every airborne tick, and the
    /// value the strength resets to once grounded
    pub increment: f32,
    /// Ceiling for the accumulated strength
    pub max: f32,
}

impl Default for GravityConfig {
    fn default() -> Self {
        Self {
            increment: 9.8,
            max: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityCapConfig {
    pub enabled: bool,
    /// A soft cap never slows a body down, it only stops further acceleration
    pub soft: bool,
    pub max_x: f32,
    pub max_y: f32,
}

impl Default for VelocityCapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            soft: false,
            max_x: 100.0,
            max_y: 100.0,
        }
    }
}

/// Collider material constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureMaterial {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for FixtureMaterial {
    fn default() -> Self {
        Self {
            density: 1.0,
            friction: 0.0,
            restitution: 0.0,
        }
    }
}

impl EngineConfig {
    /// Load and validate a RON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config = Self::from_ron(&contents)?;
        log::info!("loaded engine config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn from_ron(s: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .indentor("  ".to_string());
        let ron_string = ron::ser::to_string_pretty(self, pretty)?;
        fs::write(path, ron_string)?;
        Ok(())
    }

    /// Reject values the step loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        if !(p.timestep.is_finite() && p.timestep > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "physics.timestep must be positive, got {}",
                p.timestep
            )));
        }
        if p.velocity_iterations == 0 || p.position_iterations == 0 {
            return Err(ConfigError::Invalid(
                "solver iteration counts must be at least 1".to_string(),
            ));
        }
        if !p.world_gravity.is_finite() {
            return Err(ConfigError::Invalid("physics.world_gravity must be finite".to_string()));
        }
        if !(self.gravity.increment >= 0.0 && self.gravity.max >= self.gravity.increment) {
            return Err(ConfigError::Invalid(format!(
                "gravity needs 0 <= increment <= max, got increment {} max {}",
                self.gravity.increment, self.gravity.max
            )));
        }
        let cap = &self.velocity_cap;
        if cap.max_x < 0.0 || cap.max_y < 0.0 {
            return Err(ConfigError::Invalid("velocity_cap maxima must not be negative".to_string()));
        }
        let m = &self.material;
        if m.density < 0.0 || m.friction < 0.0 || m.restitution < 0.0 {
            return Err(ConfigError::Invalid("material constants must not be negative".to_string()));
        }
        if !(self.render.scale.is_finite() && self.render.scale > 0.0) {
            return Err(ConfigError::Invalid("render.scale must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_fixed_step() {
        let config = EngineConfig::default();
        assert!((config.physics.timestep - 1.0 / 60.0).abs() < f32::EPSILON);
        assert_eq!(config.physics.velocity_iterations, 8);
        assert_eq!(config.physics.position_iterations, 3);
        assert_eq!(config.material, FixtureMaterial { density: 1.0, friction: 0.0, restitution: 0.0 });
        assert!(!config.allow_multiple_instances);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config = EngineConfig::from_ron("(gravity: (max: 50.0), allow_multiple_instances: true)").unwrap();
        assert_eq!(config.gravity.max, 50.0);
        assert_eq!(config.gravity.increment, 9.8);
        assert!(config.allow_multiple_instances);
        assert_eq!(config.window.title, "GAME ENGINE");
    }

    #[test]
    fn test_invalid_iterations_rejected() {
        let result = EngineConfig::from_ron("(physics: (velocity_iterations: 0))");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_gravity_increment_above_max_rejected() {
        let mut config = EngineConfig::default();
        config.gravity.increment = 200.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.ron");

        let mut config = EngineConfig::default();
        config.velocity_cap.soft = true;
        config.physics.world_gravity = Vec2::new(0.0, 9.0);
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_garbage_is_parse_error() {
        assert!(matches!(EngineConfig::from_ron("(physics: ["), Err(ConfigError::Parse(_))));
    }
}
