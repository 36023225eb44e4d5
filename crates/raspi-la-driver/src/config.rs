//! Config key registry and config store dispatch
//!
//! Keys are tagged with the operations they support and the scope they live
//! in. Driver-scope keys answer from the static tables of the driver
//! descriptor and need no device; device-scope keys read and write the
//! per-device context. A key missing from the registry is always rejected.

use crate::acquisition::LifecycleOp;
use crate::device::{ChannelGroup, DeviceInstance};
use crate::driver::DriverDescriptor;
use crate::{ConfigValue, DriverError, Result};
use serde::Serialize;
use std::fmt;

/// Configuration keys known to the host.
///
/// Only some of them are handled by this driver; the rest exist so callers
/// can ask for them and get a clean `Unsupported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigKey {
    /// Device class flag: the driver is a logic analyzer
    LogicAnalyzer,
    /// Connection string used when scanning for external devices
    Conn,
    /// Sample rate in Hz
    Samplerate,
    /// Capability table of scan options
    ScanOptions,
    /// Capability table of driver and device options
    DeviceOptions,
    LimitMsec,
    LimitSamples,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 7] = [
        ConfigKey::LogicAnalyzer,
        ConfigKey::Conn,
        ConfigKey::Samplerate,
        ConfigKey::ScanOptions,
        ConfigKey::DeviceOptions,
        ConfigKey::LimitMsec,
        ConfigKey::LimitSamples,
    ];

    /// Numeric key id on the host side
    pub fn id(&self) -> u32 {
        match self {
            ConfigKey::LogicAnalyzer => 10000,
            ConfigKey::Conn => 20000,
            ConfigKey::Samplerate => 30000,
            ConfigKey::ScanOptions => 40000,
            ConfigKey::DeviceOptions => 40001,
            ConfigKey::LimitMsec => 50000,
            ConfigKey::LimitSamples => 50001,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::LogicAnalyzer => "logic_analyzer",
            ConfigKey::Conn => "conn",
            ConfigKey::Samplerate => "samplerate",
            ConfigKey::ScanOptions => "scan_options",
            ConfigKey::DeviceOptions => "device_options",
            ConfigKey::LimitMsec => "limit_msec",
            ConfigKey::LimitSamples => "limit_samples",
        }
    }

    /// Parse from a key name or a numeric id
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(id) = s.parse::<u32>() {
            return Self::from_id(id);
        }
        let normalized = s.to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|k| k.as_str() == normalized)
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations a key supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfigOps {
    pub get: bool,
    pub set: bool,
    pub list: bool,
}

impl ConfigOps {
    pub const NONE: ConfigOps = ConfigOps {
        get: false,
        set: false,
        list: false,
    };
    pub const LIST: ConfigOps = ConfigOps {
        get: false,
        set: false,
        list: true,
    };
    pub const GET_SET_LIST: ConfigOps = ConfigOps {
        get: true,
        set: true,
        list: true,
    };
}

impl fmt::Display for ConfigOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ops: Vec<&str> = [(self.get, "get"), (self.set, "set"), (self.list, "list")]
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect();
        if ops.is_empty() {
            f.write_str("-")
        } else {
            f.write_str(&ops.join("+"))
        }
    }
}

/// Where a key lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigScope {
    /// Scan and driver options, valid without a device instance
    Driver,
    /// Device options, needs a live device instance
    Device,
}

/// Registry entry: a key with its scope and supported operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConfigOption {
    pub key: ConfigKey,
    pub scope: ConfigScope,
    pub ops: ConfigOps,
}

impl ConfigOption {
    pub const fn new(key: ConfigKey, scope: ConfigScope, ops: ConfigOps) -> Self {
        Self { key, scope, ops }
    }
}

/// Look up a key in the registry of a driver
fn lookup(descriptor: &DriverDescriptor, key: ConfigKey) -> Result<&ConfigOption> {
    descriptor
        .registry
        .iter()
        .find(|opt| opt.key == key)
        .ok_or_else(|| {
            DriverError::unsupported(key, format!("not handled by {}", descriptor.name))
        })
}

fn reject_channel_group(key: ConfigKey, cg: Option<&ChannelGroup>) -> Result<()> {
    match cg {
        Some(cg) => Err(DriverError::unsupported(
            key,
            format!("device has no channel group '{}'", cg.name),
        )),
        None => Ok(()),
    }
}

fn require_device<'a>(
    key: ConfigKey,
    sdi: Option<&'a DeviceInstance>,
) -> Result<&'a DeviceInstance> {
    sdi.ok_or_else(|| DriverError::unsupported(key, "requires a device instance"))
}

/// Device a key may consult, as dictated by its registry scope.
///
/// Device-scope keys fail without an instance; driver-scope keys never see one.
fn scoped_device<'a>(
    option: &ConfigOption,
    sdi: Option<&'a DeviceInstance>,
) -> Result<Option<&'a DeviceInstance>> {
    match option.scope {
        ConfigScope::Device => require_device(option.key, sdi).map(Some),
        ConfigScope::Driver => Ok(None),
    }
}

/// Read the current value of a key
pub fn config_get(
    descriptor: &DriverDescriptor,
    key: ConfigKey,
    sdi: Option<&DeviceInstance>,
    cg: Option<&ChannelGroup>,
) -> Result<ConfigValue> {
    tracing::debug!("config_get {key}");

    let option = lookup(descriptor, key)?;
    if !option.ops.get {
        return Err(DriverError::unsupported(key, "get not supported"));
    }
    reject_channel_group(key, cg)?;
    let device = scoped_device(option, sdi)?;

    match (key, device) {
        (ConfigKey::Samplerate, Some(sdi)) => Ok(ConfigValue::U64(sdi.samplerate())),
        _ => Err(DriverError::unsupported(key, "get not supported")),
    }
}

/// Validate and write a key on a device.
///
/// Nothing is written unless every check passes.
pub fn config_set(
    descriptor: &DriverDescriptor,
    key: ConfigKey,
    value: &ConfigValue,
    sdi: &mut DeviceInstance,
    cg: Option<&ChannelGroup>,
) -> Result<()> {
    tracing::debug!("config_set {key} = {value}");

    let option = lookup(descriptor, key)?;
    if !option.ops.set {
        return Err(DriverError::unsupported(key, "set not supported"));
    }
    if option.scope != ConfigScope::Device {
        return Err(DriverError::unsupported(key, "driver option, not settable per device"));
    }
    reject_channel_group(key, cg)?;

    match key {
        ConfigKey::Samplerate => {
            let rate = value.as_u64().ok_or_else(|| {
                DriverError::invalid_value(key, format!("expected u64, got {}", value.type_name()))
            })?;
            if !descriptor.supports_samplerate(rate) {
                tracing::warn!("Rejected unsupported sample rate {rate} Hz");
                return Err(DriverError::invalid_value(
                    key,
                    format!("{rate} Hz is not a supported sample rate"),
                ));
            }
            // Sample rate is frozen while acquiring
            sdi.status().next(LifecycleOp::Configure)?;
            sdi.set_samplerate(rate);
            Ok(())
        }
        _ => Err(DriverError::unsupported(key, "set not supported")),
    }
}

/// Enumerate the possible values of a key
pub fn config_list(
    descriptor: &DriverDescriptor,
    key: ConfigKey,
    sdi: Option<&DeviceInstance>,
    cg: Option<&ChannelGroup>,
) -> Result<ConfigValue> {
    tracing::debug!("config_list {key}");

    let option = lookup(descriptor, key)?;
    if !option.ops.list {
        return Err(DriverError::unsupported(key, "list not supported"));
    }
    reject_channel_group(key, cg)?;
    let device = scoped_device(option, sdi)?;

    // Capability tables answer from the descriptor alone
    match (key, device) {
        (ConfigKey::ScanOptions, _) => Ok(ConfigValue::Keys(descriptor.scan_options.to_vec())),
        (ConfigKey::DeviceOptions, _) => Ok(ConfigValue::Options {
            driver: descriptor.driver_options.to_vec(),
            device: descriptor.device_options.to_vec(),
        }),
        (ConfigKey::Samplerate, Some(_)) => {
            Ok(ConfigValue::U64Array(descriptor.samplerates.to_vec()))
        }
        _ => Err(DriverError::unsupported(key, "list not supported")),
    }
}
