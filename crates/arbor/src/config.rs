//! Kernel configuration.
//!
//! [`KernelConfig`] carries the process-wide settings the kernel is built
//! from. Construct it with the builder methods or load it from JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::KernelError;
use crate::math::Vec2;

/// Settings for a [`Hierarchy`](crate::hierarchy::Hierarchy) and its
/// [`Engine`](crate::engine::Engine) driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Gravity applied by the physics world.
    pub gravity: Vec2,
    /// Create a physics world at startup. Physics nodes fail to awake without one.
    pub physics_enabled: bool,
    /// Fixed physics step, in seconds.
    pub fixed_timestep: f32,
    /// Largest frame delta fed to the physics accumulator.
    pub max_frame_delta: f32,
    /// Where `save_current_root_node` writes and `load_root_node` reads.
    pub save_path: Option<PathBuf>,
}

impl KernelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set gravity (builder pattern).
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    /// Enable or disable the physics world.
    pub fn with_physics(mut self, enabled: bool) -> Self {
        self.physics_enabled = enabled;
        self
    }

    pub fn with_fixed_timestep(mut self, step: f32) -> Self {
        self.fixed_timestep = step;
        self
    }

    pub fn with_max_frame_delta(mut self, max: f32) -> Self {
        self.max_frame_delta = max;
        self
    }

    /// Set the scene file used for save/load.
    pub fn with_save_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_path = Some(path.into());
        self
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, KernelError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| KernelError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, KernelError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Check the timing settings are usable by the fixed-step loop.
    pub fn validate(&self) -> Result<(), KernelError> {
        if !(self.fixed_timestep > 0.0) {
            return Err(KernelError::Config(format!(
                "fixed_timestep must be positive, got {}",
                self.fixed_timestep
            )));
        }
        if self.max_frame_delta < self.fixed_timestep {
            return Err(KernelError::Config(format!(
                "max_frame_delta ({}) is smaller than fixed_timestep ({})",
                self.max_frame_delta, self.fixed_timestep
            )));
        }
        Ok(())
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -9.81),
            physics_enabled: true,
            fixed_timestep: 1.0 / 60.0,
            max_frame_delta: 0.25,
            save_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_uses_defaults() {
        let config = KernelConfig::from_json_str(r#"{ "gravity": [0.0, -20.0] }"#).unwrap();
        assert_eq!(config.gravity, Vec2::new(0.0, -20.0));
        assert!(config.physics_enabled);
        assert!(config.save_path.is_none());
    }

    #[test]
    fn rejects_non_positive_step() {
        let err = KernelConfig::from_json_str(r#"{ "fixed_timestep": 0.0 }"#).unwrap_err();
        assert!(matches!(err, KernelError::Config(_)));
    }

    #[test]
    fn builder_sets_fields() {
        let config = KernelConfig::new()
            .with_physics(false)
            .with_save_path("level.scene");
        assert!(!config.physics_enabled);
        assert_eq!(config.save_path.as_deref(), Some(Path::new("level.scene")));
    }
}
