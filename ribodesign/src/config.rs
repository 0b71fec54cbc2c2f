// src/config.rs
//
// Environment configuration.
//
// EnvConfig is supplied once at construction and is immutable afterwards.
// It can be built from defaults, a YAML file, or environment overrides
// (RIBODESIGN_* variables, for research / batch runs).

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Local-improvement search runs only when `0 < distance < mutation_threshold`.
    pub mutation_threshold: usize,
    /// Exponent applied to `1 - normalized_distance` to shape the reward.
    pub reward_exponent: f64,
    /// The observation is a `(2 * state_radius + 1)`-site window.
    pub state_radius: usize,
    /// Emit each site as a one-channel vector (binary encoding only).
    pub use_conv: bool,
    /// Four-symbol site codes instead of the paired/unpaired collapse.
    pub use_embedding: bool,
    /// Penalise final sequences that repeat earlier ones.
    pub diversity_loss: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            mutation_threshold: 5,
            reward_exponent: 1.0,
            state_radius: 5,
            use_conv: true,
            use_embedding: false,
            diversity_loss: false,
        }
    }
}

/// Errors that can occur when loading a configuration.
#[derive(Debug, Clone)]
pub enum ConfigError {
    IoError { path: String, source: String },
    ParseError { source: String },
    ValidationError { field: String, message: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path, source)
            }
            ConfigError::ParseError { source } => {
                write!(f, "Failed to parse config YAML: {}", source)
            }
            ConfigError::ValidationError { field, message } => {
                write!(f, "Config validation error in '{}': {}", field, message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl EnvConfig {
    /// Width of the observation window.
    pub fn window_len(&self) -> usize {
        2 * self.state_radius + 1
    }

    /// Load a config from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::IoError {
            path: path.as_ref().display().to_string(),
            source: e.to_string(),
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse a config from a YAML string. Missing keys take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let cfg: EnvConfig = serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            source: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.reward_exponent.is_finite() || self.reward_exponent <= 0.0 {
            return Err(ConfigError::ValidationError {
                field: "reward_exponent".to_string(),
                message: format!("must be finite and > 0, got {}", self.reward_exponent),
            });
        }
        Ok(())
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    /// Apply environment overrides on top of `self`:
    ///
    ///   - RIBODESIGN_MUTATION_THRESHOLD  (usize)
    ///   - RIBODESIGN_REWARD_EXPONENT     (f64, > 0)
    ///   - RIBODESIGN_STATE_RADIUS        (usize)
    ///   - RIBODESIGN_USE_CONV            (bool)
    ///   - RIBODESIGN_USE_EMBEDDING       (bool)
    ///   - RIBODESIGN_DIVERSITY_LOSS      (bool)
    ///
    /// Any variable that fails to parse is ignored with a warning.
    pub fn apply_env_overrides(&mut self) {
        override_from_env("RIBODESIGN_MUTATION_THRESHOLD", &mut self.mutation_threshold, |raw| {
            raw.parse::<usize>().ok()
        });
        override_from_env("RIBODESIGN_REWARD_EXPONENT", &mut self.reward_exponent, |raw| {
            raw.parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
        });
        override_from_env("RIBODESIGN_STATE_RADIUS", &mut self.state_radius, |raw| {
            raw.parse::<usize>().ok()
        });
        override_from_env("RIBODESIGN_USE_CONV", &mut self.use_conv, parse_bool);
        override_from_env("RIBODESIGN_USE_EMBEDDING", &mut self.use_embedding, parse_bool);
        override_from_env("RIBODESIGN_DIVERSITY_LOSS", &mut self.diversity_loss, parse_bool);
    }
}

fn override_from_env<T, F>(name: &str, slot: &mut T, parse: F)
where
    T: fmt::Display,
    F: Fn(&str) -> Option<T>,
{
    let Ok(raw) = std::env::var(name) else {
        return;
    };
    match parse(raw.trim()) {
        Some(v) => {
            eprintln!("[config] {name} = {v} (overrode default)");
            *slot = v;
        }
        None => {
            eprintln!(
                "[config] WARN: could not parse {name} = {:?}; using default {}",
                raw, slot
            );
        }
    }
}

/// Parse a boolean flag (`1/0`, `true/false`, `yes/no`, `on/off`).
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let cfg = EnvConfig::default();
        assert_eq!(cfg.mutation_threshold, 5);
        assert_eq!(cfg.reward_exponent, 1.0);
        assert_eq!(cfg.state_radius, 5);
        assert!(cfg.use_conv);
        assert!(!cfg.use_embedding);
        assert!(!cfg.diversity_loss);
        assert_eq!(cfg.window_len(), 11);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let cfg = EnvConfig::from_yaml_str("state_radius: 2\ndiversity_loss: true\n").unwrap();
        assert_eq!(cfg.state_radius, 2);
        assert!(cfg.diversity_loss);
        assert_eq!(cfg.mutation_threshold, 5);
    }

    #[test]
    fn test_yaml_rejects_bad_exponent() {
        let err = EnvConfig::from_yaml_str("reward_exponent: -1.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "reward_exponent"));
    }

    #[test]
    fn test_yaml_parse_error() {
        let err = EnvConfig::from_yaml_str("state_radius: [oops").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "mutation_threshold: 3\nuse_embedding: true").unwrap();
        let cfg = EnvConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(cfg.mutation_threshold, 3);
        assert!(cfg.use_embedding);

        let missing = EnvConfig::from_yaml_file("/nonexistent/ribodesign.yaml");
        assert!(matches!(missing, Err(ConfigError::IoError { .. })));
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
