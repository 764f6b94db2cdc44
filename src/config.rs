//! Loop configuration, loadable from TOML.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::physics::PhysicsConfig;

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Frame loop configuration.
///
/// ```toml
/// max_frame_delta = 0.0333
///
/// [physics]
/// gravity = [0.0, -9.82, 0.0]
/// max_substeps = 3
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub physics: PhysicsConfig,
    /// Largest frame delta handed to the simulation, in seconds. Default: 1/30.
    pub max_frame_delta: f64,
    /// Delta reported by the very first tick. Default: 0.
    pub first_frame_delta: f64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            max_frame_delta: 1.0 / 30.0,
            first_frame_delta: 0.0,
        }
    }
}

impl LoopConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Reject values the loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let physics = &self.physics;
        if !(physics.fixed_timestep.is_finite() && physics.fixed_timestep > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "physics.fixed_timestep must be positive, got {}",
                physics.fixed_timestep
            )));
        }
        if physics.max_substeps == 0 {
            return Err(ConfigError::Invalid("physics.max_substeps must be at least 1".into()));
        }
        if physics.solver_iterations == 0 {
            return Err(ConfigError::Invalid("physics.solver_iterations must be at least 1".into()));
        }
        if !physics.gravity.is_finite() {
            return Err(ConfigError::Invalid("physics.gravity must be finite".into()));
        }
        if !(self.max_frame_delta.is_finite() && self.max_frame_delta > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_frame_delta must be positive, got {}",
                self.max_frame_delta
            )));
        }
        if !(self.first_frame_delta.is_finite() && self.first_frame_delta >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "first_frame_delta must be non-negative, got {}",
                self.first_frame_delta
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_empty_document_gives_defaults() {
        assert_eq!(LoopConfig::from_toml_str("").unwrap(), LoopConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = LoopConfig::from_toml_str(
            r#"
            max_frame_delta = 0.05

            [physics]
            gravity = [0.0, -1.62, 0.0]
            allow_sleep = false
            "#,
        )
        .unwrap();

        assert_eq!(config.max_frame_delta, 0.05);
        assert_eq!(config.physics.gravity, Vec3::new(0.0, -1.62, 0.0));
        assert!(!config.physics.allow_sleep);
        assert_eq!(config.physics.max_substeps, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = LoopConfig::from_toml_str("max_frame_delta = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = LoopConfig::from_toml_str("[physics]\nmax_substeps = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = LoopConfig::from_toml_str("max_frame_delta = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = LoopConfig::load("/definitely/not/here.toml").unwrap_err();
        match err {
            ConfigError::Io { path, .. } => assert_eq!(path, PathBuf::from("/definitely/not/here.toml")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
