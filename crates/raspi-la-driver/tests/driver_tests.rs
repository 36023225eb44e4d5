//! Integration tests for detection, config store and acquisition lifecycle

use raspi_la_driver::mock::{MockBoard, MockHost, RecordingSink};
use raspi_la_driver::{
    AcquisitionState, BoardProbe, ConfigKey, ConfigValue, DeviceInstance, Driver, DriverError,
    DriverRegistry, Packet, RASPBERRY_PI_1_4, RaspberryPiDriver,
};
use std::fs;
use tempfile::TempDir;

/// Test environment holding a mock sysroot
struct DriverTestEnv {
    #[allow(dead_code)]
    temp_dir: TempDir,
    host: MockHost,
}

impl DriverTestEnv {
    fn new(board: MockBoard) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let host = MockHost::install(temp_dir.path(), board).expect("Failed to install mock host");
        Self { temp_dir, host }
    }

    fn driver(&self) -> RaspberryPiDriver {
        RaspberryPiDriver::new(self.host.probe())
    }

    fn write_cpuinfo(&self, text: &str) {
        fs::write(self.host.root().join("proc/cpuinfo"), text).unwrap();
    }

    /// Scan and return the single detected device
    fn device(&self) -> (RaspberryPiDriver, DeviceInstance) {
        let mut driver = self.driver();
        let mut devices = driver.scan(&[]);
        assert_eq!(devices.len(), 1, "expected exactly one device");
        let sdi = devices.remove(0);
        (driver, sdi)
    }
}

#[test]
fn test_detects_pi4_model_line() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    env.write_cpuinfo("Hardware\t: BCM2711\nModel\t\t: Raspberry Pi 4 Model B Rev 1.2\n");

    let board = env.host.probe().identify_board().expect("Should detect Pi 4");
    assert!(board.model.contains("Raspberry Pi 4 Model B Rev 1.2"));
    assert_eq!(board.vendor, "Raspberry Pi");
}

#[test]
fn test_rejects_orange_pi() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    env.write_cpuinfo("Model\t\t: Orange Pi Zero\n");

    let result = env.host.probe().identify_board();
    assert!(matches!(result, Err(DriverError::NotSupported(_))));
    assert!(env.driver().scan(&[]).is_empty());
}

#[test]
fn test_rejects_description_without_model() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    env.write_cpuinfo("processor\t: 0\nHardware\t: BCM2835\n");

    let result = env.host.probe().identify_board();
    assert!(matches!(result, Err(DriverError::NotSupported(_))));
}

#[test]
fn test_missing_gpiomem_is_not_supported() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    fs::remove_file(env.host.root().join("dev/gpiomem")).unwrap();

    let result = env.host.probe().identify_board();
    assert!(matches!(result, Err(DriverError::NotSupported(_))));
}

#[test]
fn test_missing_cpuinfo_is_not_supported() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    fs::remove_file(env.host.root().join("proc/cpuinfo")).unwrap();

    assert!(env.driver().scan(&[]).is_empty());
}

#[test]
fn test_unreadable_cpuinfo_is_io_error() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    let cpuinfo = env.host.root().join("proc/cpuinfo");
    fs::remove_file(&cpuinfo).unwrap();
    fs::create_dir(&cpuinfo).unwrap();

    let result = env.host.probe().identify_board();
    assert!(matches!(result, Err(DriverError::Io(_))));
    assert!(env.driver().scan(&[]).is_empty());
}

#[test]
fn test_soc_family_filter_on_mock_hosts() {
    let pi3 = DriverTestEnv::new(MockBoard::Pi3BPlus);
    let probe = pi3.host.probe().with_soc_family("BCM283");
    assert!(probe.identify_board().is_ok());

    let pi4 = DriverTestEnv::new(MockBoard::Pi4B);
    let probe = pi4.host.probe().with_soc_family("BCM283");
    assert!(probe.identify_board().is_err());
}

#[test]
fn test_every_mock_board_scans_as_expected() {
    for board in MockBoard::ALL {
        let env = DriverTestEnv::new(board);
        let devices = env.driver().scan(&[]);

        match board.expected_model() {
            Some(model) => {
                assert_eq!(devices.len(), 1, "{} should be detected", board.as_str());
                assert_eq!(devices[0].model(), model);
            }
            None => assert!(devices.is_empty(), "{} should not", board.as_str()),
        }
    }
}

#[test]
fn test_samplerate_round_trip() {
    let env = DriverTestEnv::new(MockBoard::Pi3BPlus);
    let (driver, mut sdi) = env.device();

    for &rate in RASPBERRY_PI_1_4.samplerates {
        driver
            .config_set(ConfigKey::Samplerate, &ConfigValue::U64(rate), &mut sdi, None)
            .expect("supported rate");
        let value = driver
            .config_get(ConfigKey::Samplerate, Some(&sdi), None)
            .expect("get rate");
        assert_eq!(value, ConfigValue::U64(rate));
    }
}

#[test]
fn test_unsupported_samplerate_keeps_previous() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    let (driver, mut sdi) = env.device();

    driver
        .config_set(ConfigKey::Samplerate, &ConfigValue::U64(50_000), &mut sdi, None)
        .unwrap();

    for rate in [0, 1, 999, 1_500, 3_000_000, u64::MAX] {
        let result = driver.config_set(ConfigKey::Samplerate, &ConfigValue::U64(rate), &mut sdi, None);
        assert!(matches!(result, Err(DriverError::InvalidValue { .. })));
        assert_eq!(sdi.samplerate(), 50_000);
    }
}

#[test]
fn test_unknown_keys_rejected_without_mutation() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    let (driver, mut sdi) = env.device();
    let before = sdi.identity();

    for key in [ConfigKey::Conn, ConfigKey::LimitSamples, ConfigKey::LimitMsec] {
        assert!(matches!(
            driver.config_get(key, Some(&sdi), None),
            Err(DriverError::Unsupported { .. })
        ));
        assert!(matches!(
            driver.config_set(key, &ConfigValue::U64(1000), &mut sdi, None),
            Err(DriverError::Unsupported { .. })
        ));
        assert!(matches!(
            driver.config_list(key, Some(&sdi), None),
            Err(DriverError::Unsupported { .. })
        ));
    }

    assert_eq!(sdi.identity(), before);
}

#[test]
fn test_capability_lists_without_device() {
    let driver = RaspberryPiDriver::default();

    let scan = driver
        .config_list(ConfigKey::ScanOptions, None, None)
        .expect("scan options without device");
    assert!(scan.as_keys().is_some_and(|keys| keys.is_empty()));

    let options = driver
        .config_list(ConfigKey::DeviceOptions, None, None)
        .expect("device options without device");
    assert!(matches!(options, ConfigValue::Options { .. }));

    let rates = driver.config_list(ConfigKey::Samplerate, None, None);
    assert!(matches!(rates, Err(DriverError::Unsupported { .. })));
}

#[test]
fn test_list_samplerates_with_device() {
    let env = DriverTestEnv::new(MockBoard::Pi1B);
    let (driver, sdi) = env.device();

    let rates = driver
        .config_list(ConfigKey::Samplerate, Some(&sdi), None)
        .expect("list rates");
    assert_eq!(rates.as_u64_array(), Some(RASPBERRY_PI_1_4.samplerates));
}

#[test]
fn test_full_lifecycle() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    let (driver, mut sdi) = env.device();
    let sink = RecordingSink::new();

    assert_eq!(sdi.status(), AcquisitionState::Inactive);
    driver.dev_open(&mut sdi).expect("open");
    assert_eq!(sdi.status(), AcquisitionState::Opened);

    driver
        .config_set(ConfigKey::Samplerate, &ConfigValue::U64(200_000), &mut sdi, None)
        .expect("set rate");

    driver
        .acquisition_start(&mut sdi, Box::new(sink.clone()))
        .expect("start");
    assert_eq!(sdi.status(), AcquisitionState::Acquiring);
    assert!(sdi.counters().started_at.is_some());

    driver.acquisition_stop(&mut sdi).expect("stop");
    assert_eq!(sdi.status(), AcquisitionState::Opened);

    driver.dev_close(&mut sdi).expect("close");
    assert_eq!(sdi.status(), AcquisitionState::Inactive);

    let packets = sink.packets();
    assert_eq!(packets.len(), 2);
    assert!(matches!(
        packets[0],
        Packet::Header {
            samplerate: 200_000,
            ..
        }
    ));
    assert_eq!(packets[1], Packet::End { packets_sent: 2 });
}

#[test]
fn test_start_from_inactive_is_wrong_state() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    let (driver, mut sdi) = env.device();
    let sink = RecordingSink::new();

    let result = driver.acquisition_start(&mut sdi, Box::new(sink.clone()));
    assert!(matches!(
        result,
        Err(DriverError::WrongState {
            state: AcquisitionState::Inactive,
            ..
        })
    ));
    assert_eq!(sdi.status(), AcquisitionState::Inactive);
    assert!(sink.is_empty());
}

#[test]
fn test_double_open_and_stray_stop_rejected() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    let (driver, mut sdi) = env.device();

    driver.dev_open(&mut sdi).unwrap();
    assert!(matches!(
        driver.dev_open(&mut sdi),
        Err(DriverError::WrongState { .. })
    ));
    assert!(matches!(
        driver.acquisition_stop(&mut sdi),
        Err(DriverError::WrongState { .. })
    ));
    assert_eq!(sdi.status(), AcquisitionState::Opened);
}

#[test]
fn test_close_while_acquiring_ends_stream() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    let (driver, mut sdi) = env.device();
    let sink = RecordingSink::new();

    driver.dev_open(&mut sdi).unwrap();
    driver
        .acquisition_start(&mut sdi, Box::new(sink.clone()))
        .unwrap();
    driver.dev_close(&mut sdi).expect("close while acquiring");

    assert_eq!(sdi.status(), AcquisitionState::Inactive);
    assert!(matches!(sink.packets().last(), Some(Packet::End { .. })));
}

#[test]
fn test_samplerate_frozen_while_acquiring() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    let (driver, mut sdi) = env.device();

    driver.dev_open(&mut sdi).unwrap();
    driver
        .acquisition_start(&mut sdi, Box::new(RecordingSink::new()))
        .unwrap();

    let before = sdi.samplerate();
    let result = driver.config_set(ConfigKey::Samplerate, &ConfigValue::U64(1_000_000), &mut sdi, None);
    assert!(matches!(result, Err(DriverError::WrongState { .. })));
    assert_eq!(sdi.samplerate(), before);

    driver.acquisition_stop(&mut sdi).unwrap();
    driver
        .config_set(ConfigKey::Samplerate, &ConfigValue::U64(1_000_000), &mut sdi, None)
        .expect("set after stop");
}

#[test]
fn test_restart_resets_counters() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    let (driver, mut sdi) = env.device();
    let sink = RecordingSink::new();

    driver.dev_open(&mut sdi).unwrap();
    for _ in 0..2 {
        driver
            .acquisition_start(&mut sdi, Box::new(sink.clone()))
            .unwrap();
        driver.acquisition_stop(&mut sdi).unwrap();
    }

    let ends: Vec<Packet> = sink
        .packets()
        .into_iter()
        .filter(|p| matches!(p, Packet::End { .. }))
        .collect();
    assert_eq!(ends, vec![Packet::End { packets_sent: 2 }; 2]);
}

#[test]
fn test_cleanup_closes_devices() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    let mut driver = env.driver();
    let mut devices = driver.scan(&[]);
    let sink = RecordingSink::new();

    driver.dev_open(&mut devices[0]).unwrap();
    driver
        .acquisition_start(&mut devices[0], Box::new(sink.clone()))
        .unwrap();

    driver.cleanup(&mut devices);

    assert!(devices.is_empty());
    assert!(matches!(sink.packets().last(), Some(Packet::End { .. })));
}

#[test]
fn test_registry_scan_all_with_mock_host() {
    let env = DriverTestEnv::new(MockBoard::Pi3BPlus);
    let mut registry = DriverRegistry::builtin(env.host.probe());

    let devices = registry.scan_all();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].driver().name, "raspberry-pi-1-4");

    let driver = registry.find("raspberry-pi-1-4").expect("builtin driver");
    assert_eq!(driver.descriptor().long_name, "Raspberry Pi 1-4");
}

#[test]
fn test_scan_ignores_unknown_scan_options() {
    let env = DriverTestEnv::new(MockBoard::Pi4B);
    let mut driver = env.driver();

    let options = [raspi_la_driver::ScanOption {
        key: ConfigKey::Conn,
        value: ConfigValue::from("/dev/ttyUSB0"),
    }];
    assert_eq!(driver.scan(&options).len(), 1);
}

#[test]
fn test_default_paths_on_this_host() {
    // Outcome depends on the machine: a Pi is detected, anything else is NotSupported
    match BoardProbe::default().identify_board() {
        Ok(board) => assert!(board.model.starts_with("Raspberry Pi"), "{}", board.model),
        Err(e) => assert!(e.is_not_supported(), "unexpected detection error: {e}"),
    }
}
