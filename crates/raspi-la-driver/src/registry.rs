//! Driver registry
//!
//! Holds the drivers a host can scan with, looked up by name.

use crate::board::BoardProbe;
use crate::device::DeviceInstance;
use crate::driver::{Driver, RaspberryPiDriver};

pub struct DriverRegistry {
    drivers: Vec<Box<dyn Driver>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self {
            drivers: Vec::new(),
        }
    }

    /// Registry with every driver this crate ships
    pub fn builtin(probe: BoardProbe) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(RaspberryPiDriver::new(probe)));
        registry
    }

    /// Add a driver, replacing one registered under the same name
    pub fn register(&mut self, driver: Box<dyn Driver>) {
        let name = driver.descriptor().name;
        if let Some(pos) = self
            .drivers
            .iter()
            .position(|d| d.descriptor().name == name)
        {
            tracing::warn!("Replacing registered driver {name}");
            self.drivers[pos] = driver;
        } else {
            tracing::debug!("Registered driver {name}");
            self.drivers.push(driver);
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.drivers.iter().map(|d| d.descriptor().name).collect()
    }

    pub fn find(&self, name: &str) -> Option<&dyn Driver> {
        self.drivers
            .iter()
            .find(|d| d.descriptor().name == name)
            .map(|d| d.as_ref())
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Box<dyn Driver>> {
        self.drivers
            .iter_mut()
            .find(|d| d.descriptor().name == name)
    }

    /// Scan with every driver, collecting all devices found
    pub fn scan_all(&mut self) -> Vec<DeviceInstance> {
        let devices: Vec<DeviceInstance> = self
            .drivers
            .iter_mut()
            .flat_map(|d| d.scan(&[]))
            .collect();
        tracing::info!("Found {} device(s)", devices.len());
        devices
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
