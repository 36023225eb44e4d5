//! Raspberry Pi 1-4 on-host logic analyzer driver
//!
//! Detects whether the running host is a Raspberry Pi, exposes it as a single
//! device instance and drives its configuration and acquisition lifecycle.
//! There is no transport: the device under control is the host itself.
//!
//! # Example
//!
//! ```no_run
//! use raspi_la_driver::{BoardProbe, ConfigKey, ConfigValue, Driver, RaspberryPiDriver};
//! use raspi_la_driver::mock::RecordingSink;
//!
//! fn main() -> raspi_la_driver::Result<()> {
//!     let mut driver = RaspberryPiDriver::new(BoardProbe::default());
//!     let mut devices = driver.scan(&[]);
//!
//!     if let Some(sdi) = devices.first_mut() {
//!         driver.dev_open(sdi)?;
//!         driver.config_set(ConfigKey::Samplerate, &ConfigValue::U64(100_000), sdi, None)?;
//!         driver.acquisition_start(sdi, Box::new(RecordingSink::new()))?;
//!         driver.acquisition_stop(sdi)?;
//!         driver.dev_close(sdi)?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod acquisition;
pub mod board;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod mock;
pub mod registry;
pub mod value;

pub use acquisition::{AcquisitionState, LifecycleOp, Packet, SessionSink};
pub use board::{BoardDescriptor, BoardProbe};
pub use config::{ConfigKey, ConfigOps, ConfigOption, ConfigScope};
pub use device::{ChannelGroup, DeviceInstance};
pub use driver::{Driver, DriverDescriptor, RASPBERRY_PI_1_4, RaspberryPiDriver, ScanOption};
pub use error::DriverError;
pub use registry::DriverRegistry;
pub use value::ConfigValue;

/// Driver Result type
pub type Result<T> = std::result::Result<T, DriverError>;
