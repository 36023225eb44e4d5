//! Configuration file sections

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Log verbosity used when `RUST_LOG` is not set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter directive understood by `EnvFilter`
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Board detection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Hardware description text source
    #[serde(default = "default_cpuinfo_path")]
    pub cpuinfo_path: PathBuf,

    /// GPIO memory device probed for access
    #[serde(default = "default_gpiomem_path")]
    pub gpiomem_path: PathBuf,

    /// Require every `Hardware` line to name this SoC family (e.g. "BCM283")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soc_family: Option<String>,
}

fn default_cpuinfo_path() -> PathBuf {
    PathBuf::from("/proc/cpuinfo")
}

fn default_gpiomem_path() -> PathBuf {
    PathBuf::from("/dev/gpiomem")
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            cpuinfo_path: default_cpuinfo_path(),
            gpiomem_path: default_gpiomem_path(),
            soc_family: None,
        }
    }
}

/// Acquisition defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Sample rate (Hz) applied after opening the device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samplerate: Option<u64>,

    /// Acquisition length in milliseconds (0 = until interrupted)
    #[serde(default)]
    pub duration_ms: u64,
}

/// Logging settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_defaults() {
        let config = DetectionConfig::default();
        assert_eq!(config.cpuinfo_path, PathBuf::from("/proc/cpuinfo"));
        assert_eq!(config.gpiomem_path, PathBuf::from("/dev/gpiomem"));
        assert!(config.soc_family.is_none());
    }

    #[test]
    fn test_log_level_names() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
        assert_eq!(LogLevel::Debug.as_str(), "debug");
    }

    #[test]
    fn test_partial_detection_section() {
        let config: DetectionConfig = toml::from_str("soc_family = \"BCM283\"").unwrap();
        assert_eq!(config.soc_family.as_deref(), Some("BCM283"));
        assert_eq!(config.gpiomem_path, PathBuf::from("/dev/gpiomem"));
    }
}
