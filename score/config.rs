use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Abbreviation of normal sinus rhythm, the reference class of the challenge.
pub const DEFAULT_SINUS_RHYTHM: &str = "NSR";

/// Beta used by the F-beta and G-beta measures unless configured otherwise.
pub const DEFAULT_BETA: f64 = 2.0;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML configuration file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize configuration to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("beta must be a finite, positive number; got {0}")]
    InvalidBeta(f64),
    #[error("The default class must not be empty.")]
    EmptyDefaultClass,
}

/// Settings of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Class predicted by the reference classifier the challenge score is normalized against.
    pub default_class: String,
    pub beta: f64,
    /// Sweep classes on the rayon pool.
    pub parallel: bool,
    /// Weight table to load when no weight matrix is passed in directly. A relative
    /// path in a configuration file is taken relative to that file's directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weights_path: Option<PathBuf>,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            default_class: DEFAULT_SINUS_RHYTHM.to_string(),
            beta: DEFAULT_BETA,
            parallel: true,
            weights_path: None,
        }
    }
}

impl EvaluationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.beta.is_finite() || self.beta <= 0.0 {
            return Err(ConfigError::InvalidBeta(self.beta));
        }
        if self.default_class.is_empty() {
            return Err(ConfigError::EmptyDefaultClass);
        }
        Ok(())
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        Ok(())
    }

    /// Loads and validates a configuration file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let toml_string = fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&toml_string)?;
        config.validate()?;
        let resolved = match (&config.weights_path, path.parent()) {
            (Some(weights), Some(dir)) if weights.is_relative() => Some(dir.join(weights)),
            _ => None,
        };
        if resolved.is_some() {
            config.weights_path = resolved;
        }
        Ok(config)
    }
}
