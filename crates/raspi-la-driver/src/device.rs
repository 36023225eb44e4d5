//! Device instance model
//!
//! One instance represents the detected board. It carries identity, the
//! lifecycle state and the per-device configuration.

use crate::acquisition::{AcquisitionCounters, AcquisitionState, SessionSink};
use crate::board::BoardDescriptor;
use crate::driver::DriverDescriptor;
use serde::Serialize;
use std::fmt;

/// Placeholder version for boards without a readable hardware revision
pub const UNKNOWN_VERSION: &str = "00";
/// Placeholder serial for boards without a readable serial number
pub const UNKNOWN_SERIAL: &str = "N/A";

/// Channel group qualifier passed along config calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelGroup {
    pub name: String,
}

impl ChannelGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Per-device configuration and runtime state
#[derive(Default)]
struct DeviceContext {
    samplerate: u64,
    counters: AcquisitionCounters,
    sink: Option<Box<dyn SessionSink>>,
}

/// Identity of a device, as reported to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    pub driver: &'static str,
    pub vendor: String,
    pub model: String,
    pub version: String,
    pub serial: String,
    pub status: AcquisitionState,
    pub samplerate: u64,
}

/// A detected, controllable device
pub struct DeviceInstance {
    driver: &'static DriverDescriptor,
    vendor: String,
    model: String,
    version: String,
    serial: String,
    status: AcquisitionState,
    conn: Option<String>,
    context: DeviceContext,
}

impl DeviceInstance {
    /// Build the instance for a detected board.
    ///
    /// Starts inactive, with the driver's first supported sample rate.
    pub fn new(board: BoardDescriptor, driver: &'static DriverDescriptor) -> Self {
        Self {
            driver,
            vendor: board.vendor,
            model: board.model,
            version: UNKNOWN_VERSION.to_string(),
            serial: UNKNOWN_SERIAL.to_string(),
            status: AcquisitionState::Inactive,
            conn: None,
            context: DeviceContext {
                samplerate: driver.default_samplerate(),
                ..Default::default()
            },
        }
    }

    pub fn driver(&self) -> &'static DriverDescriptor {
        self.driver
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn status(&self) -> AcquisitionState {
        self.status
    }

    /// Transport handle; always `None` for on-host devices
    pub fn connection(&self) -> Option<&str> {
        self.conn.as_deref()
    }

    /// Current sample rate (Hz)
    pub fn samplerate(&self) -> u64 {
        self.context.samplerate
    }

    pub fn counters(&self) -> AcquisitionCounters {
        self.context.counters
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity {
            driver: self.driver.name,
            vendor: self.vendor.clone(),
            model: self.model.clone(),
            version: self.version.clone(),
            serial: self.serial.clone(),
            status: self.status,
            samplerate: self.context.samplerate,
        }
    }

    pub(crate) fn set_status(&mut self, status: AcquisitionState) {
        tracing::debug!("{}: {} -> {}", self.model, self.status, status);
        self.status = status;
    }

    pub(crate) fn set_samplerate(&mut self, samplerate: u64) {
        self.context.samplerate = samplerate;
    }

    pub(crate) fn counters_mut(&mut self) -> &mut AcquisitionCounters {
        &mut self.context.counters
    }

    pub(crate) fn attach_sink(&mut self, sink: Box<dyn SessionSink>) {
        self.context.sink = Some(sink);
    }

    pub(crate) fn detach_sink(&mut self) -> Option<Box<dyn SessionSink>> {
        self.context.sink.take()
    }
}

impl fmt::Debug for DeviceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceInstance")
            .field("driver", &self.driver.name)
            .field("vendor", &self.vendor)
            .field("model", &self.model)
            .field("version", &self.version)
            .field("serial", &self.serial)
            .field("status", &self.status)
            .field("conn", &self.conn)
            .field("samplerate", &self.context.samplerate)
            .finish_non_exhaustive()
    }
}
