//! Driver descriptor and the driver interface consumed by the host

use crate::acquisition::{self, SessionSink};
use crate::board::BoardProbe;
use crate::config::{self, ConfigKey, ConfigOps, ConfigOption, ConfigScope};
use crate::device::{ChannelGroup, DeviceInstance};
use crate::{ConfigValue, Result};
use serde::Serialize;

/// Static description of a driver: metadata and capability tables
#[derive(Debug, Serialize)]
pub struct DriverDescriptor {
    pub name: &'static str,
    pub long_name: &'static str,
    pub api_version: u32,
    /// Options accepted by scan
    pub scan_options: &'static [ConfigKey],
    /// Driver-wide capabilities
    pub driver_options: &'static [ConfigKey],
    /// Per-device options with their operations
    pub device_options: &'static [ConfigOption],
    /// Every key the config store dispatches on
    #[serde(skip)]
    pub registry: &'static [ConfigOption],
    /// Supported sample rates (Hz), ascending
    pub samplerates: &'static [u64],
}

impl DriverDescriptor {
    pub fn supports_samplerate(&self, hz: u64) -> bool {
        self.samplerates.contains(&hz)
    }

    pub fn default_samplerate(&self) -> u64 {
        self.samplerates.first().copied().unwrap_or_default()
    }
}

const SAMPLERATES: [u64; 10] = [
    1_000, 2_000, 5_000, 10_000, 20_000, 50_000, 100_000, 200_000, 500_000, 1_000_000,
];

const DEVICE_OPTIONS: [ConfigOption; 1] = [ConfigOption::new(
    ConfigKey::Samplerate,
    ConfigScope::Device,
    ConfigOps::GET_SET_LIST,
)];

const REGISTRY: [ConfigOption; 4] = [
    ConfigOption::new(ConfigKey::ScanOptions, ConfigScope::Driver, ConfigOps::LIST),
    ConfigOption::new(ConfigKey::DeviceOptions, ConfigScope::Driver, ConfigOps::LIST),
    ConfigOption::new(ConfigKey::LogicAnalyzer, ConfigScope::Driver, ConfigOps::NONE),
    ConfigOption::new(
        ConfigKey::Samplerate,
        ConfigScope::Device,
        ConfigOps::GET_SET_LIST,
    ),
];

/// The Raspberry Pi 1-4 driver
pub static RASPBERRY_PI_1_4: DriverDescriptor = DriverDescriptor {
    name: "raspberry-pi-1-4",
    long_name: "Raspberry Pi 1-4",
    api_version: 1,
    scan_options: &[],
    driver_options: &[ConfigKey::LogicAnalyzer],
    device_options: &DEVICE_OPTIONS,
    registry: &REGISTRY,
    samplerates: &SAMPLERATES,
};

/// Option passed to scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOption {
    pub key: ConfigKey,
    pub value: ConfigValue,
}

/// Operations a host calls on a driver.
///
/// Config and lifecycle operations have default implementations backed by
/// the generic config store and state machine; drivers override them when
/// they have hardware to program.
pub trait Driver {
    fn descriptor(&self) -> &'static DriverDescriptor;

    /// Look for devices. Detection failures yield an empty list.
    fn scan(&mut self, options: &[ScanOption]) -> Vec<DeviceInstance>;

    fn dev_open(&self, sdi: &mut DeviceInstance) -> Result<()> {
        acquisition::dev_open(sdi)
    }

    fn dev_close(&self, sdi: &mut DeviceInstance) -> Result<()> {
        acquisition::dev_close(sdi)
    }

    fn config_get(
        &self,
        key: ConfigKey,
        sdi: Option<&DeviceInstance>,
        cg: Option<&ChannelGroup>,
    ) -> Result<ConfigValue> {
        config::config_get(self.descriptor(), key, sdi, cg)
    }

    fn config_set(
        &self,
        key: ConfigKey,
        value: &ConfigValue,
        sdi: &mut DeviceInstance,
        cg: Option<&ChannelGroup>,
    ) -> Result<()> {
        config::config_set(self.descriptor(), key, value, sdi, cg)
    }

    fn config_list(
        &self,
        key: ConfigKey,
        sdi: Option<&DeviceInstance>,
        cg: Option<&ChannelGroup>,
    ) -> Result<ConfigValue> {
        config::config_list(self.descriptor(), key, sdi, cg)
    }

    fn acquisition_start(
        &self,
        sdi: &mut DeviceInstance,
        sink: Box<dyn SessionSink>,
    ) -> Result<()> {
        acquisition::acquisition_start(sdi, sink)
    }

    fn acquisition_stop(&self, sdi: &mut DeviceInstance) -> Result<()> {
        acquisition::acquisition_stop(sdi)
    }

    /// Close every device and drop the list
    fn cleanup(&self, devices: &mut Vec<DeviceInstance>) {
        for sdi in devices.iter_mut() {
            if sdi.status() != crate::AcquisitionState::Inactive
                && let Err(e) = self.dev_close(sdi)
            {
                tracing::error!("Failed to close {}: {}", sdi.model(), e);
            }
        }
        devices.clear();
    }
}

/// Driver for the Raspberry Pi this process runs on
#[derive(Debug, Clone, Default)]
pub struct RaspberryPiDriver {
    probe: BoardProbe,
}

impl RaspberryPiDriver {
    pub fn new(probe: BoardProbe) -> Self {
        Self { probe }
    }
}

impl Driver for RaspberryPiDriver {
    fn descriptor(&self) -> &'static DriverDescriptor {
        &RASPBERRY_PI_1_4
    }

    fn scan(&mut self, options: &[ScanOption]) -> Vec<DeviceInstance> {
        tracing::debug!("scan");

        for option in options {
            if !RASPBERRY_PI_1_4.scan_options.contains(&option.key) {
                tracing::debug!("Ignoring scan option {} = {}", option.key, option.value);
            }
        }

        match self.probe.identify_board() {
            Ok(board) => vec![DeviceInstance::new(board, &RASPBERRY_PI_1_4)],
            Err(e) if e.is_not_supported() => {
                tracing::info!("No {} found: {}", RASPBERRY_PI_1_4.long_name, e);
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Board detection failed: {}", e);
                Vec::new()
            }
        }
    }
}
