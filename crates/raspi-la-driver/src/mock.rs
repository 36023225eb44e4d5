//! Mock host for testing without a Raspberry Pi
//!
//! Writes a small sysroot (a `proc/cpuinfo` and a `dev/gpiomem` file) for a
//! chosen board so detection can run on any machine, and provides a session
//! sink that records every packet.
//!
//! # Usage
//!
//! ```no_run
//! use raspi_la_driver::mock::{MockBoard, MockHost};
//! use raspi_la_driver::{Driver, RaspberryPiDriver};
//! use std::path::Path;
//!
//! let host = MockHost::install(Path::new("/tmp/raspi-la-sysroot"), MockBoard::Pi4B)?;
//! let mut driver = RaspberryPiDriver::new(host.probe());
//! assert_eq!(driver.scan(&[]).len(), 1);
//! # Ok::<(), std::io::Error>(())
//! ```

use crate::acquisition::{Packet, SessionSink};
use crate::board::BoardProbe;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Pre-defined mock boards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBoard {
    /// Raspberry Pi Model B (BCM2835, ARMv6)
    Pi1B,
    /// Raspberry Pi 3 Model B+ (BCM2837)
    Pi3BPlus,
    /// Raspberry Pi 4 Model B (BCM2711)
    Pi4B,
    /// Orange Pi Zero (Allwinner H2+), not supported
    OrangePiZero,
    /// Desktop PC without any board model line
    GenericX86,
}

impl MockBoard {
    pub const ALL: [MockBoard; 5] = [
        MockBoard::Pi1B,
        MockBoard::Pi3BPlus,
        MockBoard::Pi4B,
        MockBoard::OrangePiZero,
        MockBoard::GenericX86,
    ];

    /// Short name used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            MockBoard::Pi1B => "pi1b",
            MockBoard::Pi3BPlus => "pi3b+",
            MockBoard::Pi4B => "pi4b",
            MockBoard::OrangePiZero => "orangepi-zero",
            MockBoard::GenericX86 => "x86",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|b| b.as_str() == s)
    }

    /// Model string detection should report, if the board is supported
    pub fn expected_model(&self) -> Option<&'static str> {
        match self {
            MockBoard::Pi1B => Some("Raspberry Pi Model B Rev 2"),
            MockBoard::Pi3BPlus => Some("Raspberry Pi 3 Model B Plus Rev 1.3"),
            MockBoard::Pi4B => Some("Raspberry Pi 4 Model B Rev 1.2"),
            MockBoard::OrangePiZero | MockBoard::GenericX86 => None,
        }
    }

    /// Whether the board exposes a GPIO memory device
    pub fn has_gpiomem(&self) -> bool {
        !matches!(self, MockBoard::GenericX86)
    }

    /// `/proc/cpuinfo` contents for this board
    pub fn cpuinfo(&self) -> String {
        match self {
            MockBoard::Pi1B => arm_cpuinfo(
                1,
                "ARMv6-compatible processor rev 7 (v6l)",
                "BCM2835",
                "000e",
                "Raspberry Pi Model B Rev 2",
            ),
            MockBoard::Pi3BPlus => arm_cpuinfo(
                4,
                "ARMv7 Processor rev 4 (v7l)",
                "BCM2835",
                "a020d3",
                "Raspberry Pi 3 Model B Plus Rev 1.3",
            ),
            MockBoard::Pi4B => arm_cpuinfo(
                4,
                "ARMv7 Processor rev 3 (v7l)",
                "BCM2711",
                "c03112",
                "Raspberry Pi 4 Model B Rev 1.2",
            ),
            MockBoard::OrangePiZero => arm_cpuinfo(
                4,
                "ARMv7 Processor rev 5 (v7l)",
                "sun8i",
                "0000",
                "Orange Pi Zero",
            ),
            MockBoard::GenericX86 => {
                let mut text = String::new();
                for cpu in 0..4 {
                    text.push_str(&format!(
                        "processor\t: {cpu}\nvendor_id\t: GenuineIntel\n\
                         model name\t: Intel(R) Core(TM) i7-8550U CPU @ 1.80GHz\n\n"
                    ));
                }
                text
            }
        }
    }
}

fn arm_cpuinfo(cpus: u32, cpu_model: &str, hardware: &str, revision: &str, model: &str) -> String {
    let mut text = String::new();
    for cpu in 0..cpus {
        text.push_str(&format!(
            "processor\t: {cpu}\nmodel name\t: {cpu_model}\nBogoMIPS\t: 108.00\n\n"
        ));
    }
    text.push_str(&format!(
        "Hardware\t: {hardware}\nRevision\t: {revision}\n\
         Serial\t\t: 100000002c5b1a3e\nModel\t\t: {model}\n"
    ));
    text
}

/// A sysroot written to disk for one mock board
#[derive(Debug, Clone)]
pub struct MockHost {
    root: PathBuf,
}

impl MockHost {
    /// Write the sysroot for `board` under `root`
    pub fn install(root: &Path, board: MockBoard) -> std::io::Result<Self> {
        let proc_dir = root.join("proc");
        let dev_dir = root.join("dev");
        fs::create_dir_all(&proc_dir)?;
        fs::create_dir_all(&dev_dir)?;

        fs::write(proc_dir.join("cpuinfo"), board.cpuinfo())?;

        let gpiomem = dev_dir.join("gpiomem");
        if board.has_gpiomem() {
            fs::write(&gpiomem, b"")?;
        } else if gpiomem.exists() {
            fs::remove_file(&gpiomem)?;
        }

        tracing::debug!("Installed mock {} at {}", board.as_str(), root.display());
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Probe configuration pointing into this sysroot
    pub fn probe(&self) -> BoardProbe {
        BoardProbe::with_root(&self.root)
    }
}

/// Session sink that keeps every packet, shareable with the test body
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    packets: Arc<Mutex<Vec<Packet>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the packets received so far
    pub fn packets(&self) -> Vec<Packet> {
        self.packets
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.packets.lock().map(|p| p.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionSink for RecordingSink {
    fn send(&mut self, packet: Packet) {
        if let Ok(mut packets) = self.packets.lock() {
            packets.push(packet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::parse_cpuinfo;
    use std::io::Cursor;

    #[test]
    fn test_mock_board_names() {
        for board in MockBoard::ALL {
            assert_eq!(MockBoard::parse(board.as_str()), Some(board));
        }
        assert_eq!(MockBoard::parse("PI4B"), Some(MockBoard::Pi4B));
        assert_eq!(MockBoard::parse("pi5"), None);
    }

    #[test]
    fn test_mock_cpuinfo_detection() {
        for board in MockBoard::ALL {
            let result = parse_cpuinfo(Cursor::new(board.cpuinfo()), None);
            match board.expected_model() {
                Some(model) => assert_eq!(result.expect("supported board").model, model),
                None => assert!(result.is_err(), "{} should be rejected", board.as_str()),
            }
        }
    }

    #[test]
    fn test_recording_sink_shares_packets() {
        let sink = RecordingSink::new();
        let mut boxed: Box<dyn SessionSink> = Box::new(sink.clone());

        boxed.send(Packet::End { packets_sent: 1 });

        assert_eq!(sink.len(), 1);
        assert_eq!(sink.packets(), vec![Packet::End { packets_sent: 1 }]);
    }
}
