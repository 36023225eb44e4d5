//! Configuration management for raspi-la
//!
//! TOML configuration files for board detection, acquisition defaults and
//! logging. Files are layered system, then user, then `RASPI_LA__*`
//! environment variables.

mod sections;

pub use sections::{AcquisitionConfig, DetectionConfig, LogLevel, LoggingConfig};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Failed to merge configuration: {0}")]
    Layered(#[from] config::ConfigError),
}

/// Standard configuration paths
pub const CONFIG_DIR: &str = "/etc/raspi-la";
pub const CONFIG_FILE: &str = "config.toml";
/// Prefix of environment overrides, e.g. `RASPI_LA__DETECTION__SOC_FAMILY`
pub const ENV_PREFIX: &str = "RASPI_LA";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaspiLaConfig {
    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RaspiLaConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Merge the given files in order, then environment overrides.
    ///
    /// Missing files are skipped; later sources win.
    pub fn load_layered(paths: &[PathBuf]) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        for path in paths {
            tracing::debug!("Config layer {}", path.display());
            builder = builder.add_source(config::File::from(path.as_path()).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the system and user locations
    pub fn load_default() -> Result<Self, ConfigError> {
        let paths = default_paths();
        if !paths.iter().any(|p| p.exists()) {
            tracing::warn!("No configuration file found, using defaults");
        }
        Self::load_layered(&paths)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.acquisition.samplerate == Some(0) {
            return Err(ConfigError::Invalid(
                "acquisition.samplerate must be positive".into(),
            ));
        }
        if let Some(family) = &self.detection.soc_family
            && family.trim().is_empty()
        {
            return Err(ConfigError::Invalid(
                "detection.soc_family must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// System file, then the user file under `$HOME/.config`
pub fn default_paths() -> Vec<PathBuf> {
    let mut paths = vec![Path::new(CONFIG_DIR).join(CONFIG_FILE)];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(
            PathBuf::from(home)
                .join(".config/raspi-la")
                .join(CONFIG_FILE),
        );
    }
    paths
}
