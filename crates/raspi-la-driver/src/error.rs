//! Driver error taxonomy

use crate::acquisition::{AcquisitionState, LifecycleOp};
use crate::config::ConfigKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    /// The host is not a supported board. Scanning maps this to "no devices".
    #[error("Board not supported: {0}")]
    NotSupported(String),

    /// Key, operation or scope not handled by this driver.
    #[error("Unsupported config key {key}: {reason}")]
    Unsupported { key: ConfigKey, reason: String },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: ConfigKey, reason: String },

    #[error("Cannot {op} while device is {state}")]
    WrongState {
        op: LifecycleOp,
        state: AcquisitionState,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    pub(crate) fn unsupported(key: ConfigKey, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            key,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_value(key: ConfigKey, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            reason: reason.into(),
        }
    }

    /// True for the "no matching board" outcome of detection
    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported(_))
    }
}
