//! Acquisition lifecycle
//!
//! Devices move `Inactive -> Opened -> Acquiring` and back. Every operation
//! goes through [`AcquisitionState::next`]; an operation that is not in the
//! transition table fails with `WrongState` and leaves the device untouched.
//! The new state is committed only once all side effects succeeded.

use crate::device::DeviceInstance;
use crate::{ConfigKey, DriverError, Result};
use serde::Serialize;
use std::fmt;
use std::time::SystemTime;

/// Lifecycle state of a device instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionState {
    #[default]
    Inactive,
    Opened,
    Acquiring,
}

impl AcquisitionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionState::Inactive => "inactive",
            AcquisitionState::Opened => "opened",
            AcquisitionState::Acquiring => "acquiring",
        }
    }

    /// Transition table
    pub fn next(self, op: LifecycleOp) -> Result<Self> {
        use AcquisitionState::*;
        use LifecycleOp::*;

        match (self, op) {
            (Inactive, Open) => Ok(Opened),
            (Opened | Acquiring, Close) => Ok(Inactive),
            (Opened, Start) => Ok(Acquiring),
            (Acquiring, Stop) => Ok(Opened),
            (Inactive | Opened, Configure) => Ok(self),
            (state, op) => Err(DriverError::WrongState { op, state }),
        }
    }
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations that move a device through its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleOp {
    Open,
    Close,
    Start,
    Stop,
    /// Writing device configuration
    Configure,
}

impl fmt::Display for LifecycleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleOp::Open => "open",
            LifecycleOp::Close => "close",
            LifecycleOp::Start => "start acquisition",
            LifecycleOp::Stop => "stop acquisition",
            LifecycleOp::Configure => "configure",
        })
    }
}

/// Notification sent to the session layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "packet", rename_all = "snake_case")]
pub enum Packet {
    /// Stream start
    Header {
        feed_version: u32,
        samplerate: u64,
        #[serde(skip)]
        start_time: SystemTime,
    },
    /// Stream end
    End { packets_sent: u64 },
}

pub const FEED_VERSION: u32 = 1;

/// Receiver of session packets, owned by the device while it acquires
pub trait SessionSink: Send {
    fn send(&mut self, packet: Packet);
}

/// Per-acquisition counters, reset on every start
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcquisitionCounters {
    pub packets_sent: u64,
    pub started_at: Option<SystemTime>,
}

pub fn dev_open(sdi: &mut DeviceInstance) -> Result<()> {
    tracing::debug!("dev_open");

    let next = sdi.status().next(LifecycleOp::Open)?;
    // On-host device: no connection handle to acquire
    if let Some(conn) = sdi.connection() {
        tracing::debug!("Ignoring connection {conn} for on-host device");
    }
    sdi.set_status(next);
    Ok(())
}

/// Close a device, stopping a running acquisition first
pub fn dev_close(sdi: &mut DeviceInstance) -> Result<()> {
    tracing::debug!("dev_close");

    let next = sdi.status().next(LifecycleOp::Close)?;
    if sdi.status() == AcquisitionState::Acquiring {
        tracing::info!("Closing {} while acquiring, stopping first", sdi.model());
        finish_stream(sdi);
    }
    sdi.set_status(next);
    Ok(())
}

pub fn acquisition_start(sdi: &mut DeviceInstance, mut sink: Box<dyn SessionSink>) -> Result<()> {
    tracing::debug!("dev_acquisition_start");

    let next = sdi.status().next(LifecycleOp::Start)?;

    let samplerate = sdi.samplerate();
    if !sdi.driver().supports_samplerate(samplerate) {
        return Err(DriverError::InvalidValue {
            key: ConfigKey::Samplerate,
            reason: format!("{samplerate} Hz is not a supported sample rate"),
        });
    }

    let start_time = SystemTime::now();
    let counters = sdi.counters_mut();
    *counters = AcquisitionCounters {
        packets_sent: 0,
        started_at: Some(start_time),
    };

    sink.send(Packet::Header {
        feed_version: FEED_VERSION,
        samplerate,
        start_time,
    });
    counters.packets_sent += 1;

    sdi.attach_sink(sink);
    sdi.set_status(next);
    tracing::info!("Acquisition started at {samplerate} Hz");
    Ok(())
}

pub fn acquisition_stop(sdi: &mut DeviceInstance) -> Result<()> {
    tracing::debug!("dev_acquisition_stop");

    let next = sdi.status().next(LifecycleOp::Stop)?;
    finish_stream(sdi);
    sdi.set_status(next);
    Ok(())
}

/// Send the end packet and release the session sink
fn finish_stream(sdi: &mut DeviceInstance) {
    let Some(mut sink) = sdi.detach_sink() else {
        tracing::warn!("No session sink attached, end of stream not reported");
        return;
    };
    let counters = sdi.counters_mut();
    counters.packets_sent += 1;
    sink.send(Packet::End {
        packets_sent: counters.packets_sent,
    });
    tracing::info!("Acquisition stopped after {} packets", counters.packets_sent);
}
