//! Board detection
//!
//! Decides whether the running host is a Raspberry Pi 1-4 by probing the GPIO
//! memory device and reading the `Model` line of `/proc/cpuinfo`.
//!
//! Detection reads the description line by line. Every line containing
//! `Model` must name a Raspberry Pi; the last such line wins. A `Model` line
//! naming anything else rejects the host, and so does a description without
//! any `Model` line.

use crate::{DriverError, Result};
use nix::fcntl::{OFlag, open};
use nix::sys::stat::Mode;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Board family name, also the vendor of every device instance
pub const VENDOR: &str = "Raspberry Pi";

const MODEL_MARKER: &str = "Model";
const HARDWARE_MARKER: &str = "Hardware";

pub const DEFAULT_CPUINFO_PATH: &str = "/proc/cpuinfo";
pub const DEFAULT_GPIOMEM_PATH: &str = "/dev/gpiomem";

/// Result of a successful detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardDescriptor {
    pub vendor: String,
    pub model: String,
}

impl BoardDescriptor {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            vendor: VENDOR.to_string(),
            model: model.into(),
        }
    }
}

/// Where detection looks, and how strict it is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardProbe {
    /// Hardware description text source
    pub cpuinfo_path: PathBuf,
    /// Hardware access device, probed for openability only
    pub gpiomem_path: PathBuf,
    /// When set, every `Hardware` line must contain this SoC family
    /// (e.g. `BCM283`)
    pub soc_family: Option<String>,
}

impl Default for BoardProbe {
    fn default() -> Self {
        Self {
            cpuinfo_path: PathBuf::from(DEFAULT_CPUINFO_PATH),
            gpiomem_path: PathBuf::from(DEFAULT_GPIOMEM_PATH),
            soc_family: None,
        }
    }
}

impl BoardProbe {
    /// Probe with both files under a custom root, e.g. a test sysroot
    pub fn with_root(root: &Path) -> Self {
        Self {
            cpuinfo_path: root.join("proc/cpuinfo"),
            gpiomem_path: root.join("dev/gpiomem"),
            soc_family: None,
        }
    }

    pub fn with_soc_family(mut self, family: impl Into<String>) -> Self {
        self.soc_family = Some(family.into());
        self
    }

    /// Identify the board this process runs on
    pub fn identify_board(&self) -> Result<BoardDescriptor> {
        probe_hardware_access(&self.gpiomem_path)?;

        let file = File::open(&self.cpuinfo_path).map_err(|e| {
            DriverError::NotSupported(format!(
                "cannot open {}: {}",
                self.cpuinfo_path.display(),
                e
            ))
        })?;

        let board = parse_cpuinfo(BufReader::new(file), self.soc_family.as_deref())?;
        tracing::info!("Detected {} ({})", board.model, board.vendor);
        Ok(board)
    }
}

/// Check that the hardware access device exists and can be opened.
///
/// The descriptor is closed before returning; nothing is kept open.
pub fn probe_hardware_access(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(DriverError::NotSupported(format!(
            "{} does not exist",
            path.display()
        )));
    }

    let fd = open(
        path,
        OFlag::O_RDWR | OFlag::O_SYNC | OFlag::O_CLOEXEC,
        Mode::empty(),
    )
    .map_err(|e| DriverError::NotSupported(format!("cannot open {}: {}", path.display(), e)))?;

    if let Err(e) = nix::unistd::close(fd) {
        tracing::warn!("Failed to close {}: {}", path.display(), e);
    }

    tracing::debug!("{} is accessible", path.display());
    Ok(())
}

/// Run the detection algorithm over a hardware description.
///
/// A read failure is an `Io` error, not a verdict on the board.
pub fn parse_cpuinfo<R: BufRead>(reader: R, soc_family: Option<&str>) -> Result<BoardDescriptor> {
    let mut model: Option<String> = None;

    for record in reader.split(b'\n') {
        let record = record?;
        let line = String::from_utf8_lossy(&record);

        if let Some(family) = soc_family
            && line.contains(HARDWARE_MARKER)
        {
            if !line.contains(family) {
                return Err(DriverError::NotSupported(format!(
                    "not a {family} CPU: {}",
                    line.trim()
                )));
            }
            tracing::debug!("CPU: {}", line.trim());
        }

        if line.contains(MODEL_MARKER) {
            let Some(idx) = line.find(VENDOR) else {
                return Err(DriverError::NotSupported(format!(
                    "not a {VENDOR}: {}",
                    line.trim()
                )));
            };
            let captured = line[idx..].trim().to_string();
            tracing::debug!("Model: {captured}");
            model = Some(captured);
        }
    }

    match model {
        Some(model) => Ok(BoardDescriptor::new(model)),
        None => Err(DriverError::NotSupported("no Model line found".into())),
    }
}
