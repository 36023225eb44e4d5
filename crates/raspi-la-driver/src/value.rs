//! Boxed config values crossing the driver boundary

use crate::config::{ConfigKey, ConfigOption};
use serde::Serialize;
use std::fmt;

/// Tagged value passed to and returned from the config store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ConfigValue {
    U64(u64),
    Bool(bool),
    Str(String),
    U64Array(Vec<u64>),
    /// Key list, used for the scan options table
    Keys(Vec<ConfigKey>),
    /// Driver options and device options tables
    Options {
        driver: Vec<ConfigKey>,
        device: Vec<ConfigOption>,
    },
}

impl ConfigValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ConfigValue::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64_array(&self) -> Option<&[u64]> {
        match self {
            ConfigValue::U64Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_keys(&self) -> Option<&[ConfigKey]> {
        match self {
            ConfigValue::Keys(v) => Some(v),
            _ => None,
        }
    }

    /// Type tag used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::U64(_) => "u64",
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Str(_) => "string",
            ConfigValue::U64Array(_) => "u64 array",
            ConfigValue::Keys(_) => "key array",
            ConfigValue::Options { .. } => "option tables",
        }
    }

    /// Parse a scalar from text: integers become `U64`, `true`/`false`
    /// become `Bool`, anything else a `Str`.
    ///
    /// Integers accept an SI suffix (`k`, `M`, `G`) and an optional `Hz`,
    /// so `"100kHz"` and `"1M"` both work.
    pub fn parse_scalar(s: &str) -> Self {
        let s = s.trim();
        match s {
            "true" => return ConfigValue::Bool(true),
            "false" => return ConfigValue::Bool(false),
            _ => {}
        }
        parse_si_u64(s)
            .map(ConfigValue::U64)
            .unwrap_or_else(|| ConfigValue::Str(s.to_string()))
    }
}

fn parse_si_u64(s: &str) -> Option<u64> {
    let s = s.strip_suffix("Hz").or_else(|| s.strip_suffix("hz")).unwrap_or(s);
    let (digits, multiplier) = match s.chars().last()? {
        'k' | 'K' => (&s[..s.len() - 1], 1_000),
        'M' => (&s[..s.len() - 1], 1_000_000),
        'G' => (&s[..s.len() - 1], 1_000_000_000),
        _ => (s, 1),
    };
    digits.trim().parse::<u64>().ok()?.checked_mul(multiplier)
}

/// Format a rate in Hz with the largest SI unit that divides it
pub fn format_hz(hz: u64) -> String {
    match hz {
        0 => "0 Hz".to_string(),
        _ if hz % 1_000_000_000 == 0 => format!("{} GHz", hz / 1_000_000_000),
        _ if hz % 1_000_000 == 0 => format!("{} MHz", hz / 1_000_000),
        _ if hz % 1_000 == 0 => format!("{} kHz", hz / 1_000),
        _ => format!("{hz} Hz"),
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::U64(v) => write!(f, "{v}"),
            ConfigValue::Bool(v) => write!(f, "{v}"),
            ConfigValue::Str(v) => write!(f, "\"{v}\""),
            ConfigValue::U64Array(v) => {
                let items: Vec<String> = v.iter().map(u64::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
            ConfigValue::Keys(v) => {
                let items: Vec<&str> = v.iter().map(ConfigKey::as_str).collect();
                write!(f, "[{}]", items.join(", "))
            }
            ConfigValue::Options { driver, device } => {
                let driver: Vec<&str> = driver.iter().map(ConfigKey::as_str).collect();
                let device: Vec<String> = device
                    .iter()
                    .map(|o| format!("{}({})", o.key, o.ops))
                    .collect();
                write!(
                    f,
                    "driver: [{}], device: [{}]",
                    driver.join(", "),
                    device.join(", ")
                )
            }
        }
    }
}

impl From<u64> for ConfigValue {
    fn from(v: u64) -> Self {
        ConfigValue::U64(v)
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Str(v.to_string())
    }
}

impl From<Vec<u64>> for ConfigValue {
    fn from(v: Vec<u64>) -> Self {
        ConfigValue::U64Array(v)
    }
}
