//! `raspi-la` - command line front end for the Raspberry Pi logic analyzer driver
//!
//! ```text
//! USAGE:
//!   raspi-la scan                     Detect the board this runs on
//!   raspi-la info                     Driver metadata and capability tables
//!   raspi-la list <key>               Possible values of a config key
//!   raspi-la get <key>                Current value of a config key
//!   raspi-la set <key> <value>        Validate and apply a config value
//!   raspi-la acquire                  Run open, start, stop and close
//! ```
//!
//! `--mock <board>` runs against a generated sysroot instead of the real
//! `/proc/cpuinfo` and `/dev/gpiomem`.

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use raspi_la_config::{LogLevel, RaspiLaConfig};
use raspi_la_driver::mock::{MockBoard, MockHost};
use raspi_la_driver::value::format_hz;
use raspi_la_driver::{
    BoardProbe, ConfigKey, ConfigValue, DeviceInstance, Driver, DriverRegistry, Packet,
    RASPBERRY_PI_1_4, SessionSink,
};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "raspi-la", about = "Raspberry Pi on-host logic analyzer", version)]
struct Cli {
    /// Configuration file (default: system and user locations)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use a mock board instead of the real host (pi1b, pi3b+, pi4b, orangepi-zero, x86)
    #[arg(long, global = true)]
    mock: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Detect the board and list devices.
    Scan,
    /// Print driver metadata and capability tables.
    Info,
    /// List the possible values of a config key.
    List {
        /// Key name (e.g. samplerate, scan_options) or numeric id.
        key: String,
    },
    /// Print the current value of a config key.
    Get {
        /// Key name or numeric id.
        key: String,
    },
    /// Validate and apply a config value on the detected device.
    Set {
        /// Key name or numeric id.
        key: String,
        /// Value, e.g. 100k or 1000000.
        value: String,
    },
    /// Open the device, run an acquisition and close it again.
    Acquire {
        /// Sample rate, e.g. 200k. Defaults to the configured rate.
        #[arg(long)]
        samplerate: Option<String>,
        /// Stop after this many milliseconds (0 waits for Ctrl-C).
        #[arg(long)]
        duration_ms: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging starts before the config so loading problems are reported
    let logging = setup_logging();

    let config = match &cli.config {
        Some(path) => RaspiLaConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => RaspiLaConfig::load_default().context("Failed to load configuration")?,
    };

    logging.set_level(config.logging.level);

    let mock = match &cli.mock {
        Some(name) => Some(MockSysroot::install(name)?),
        None => None,
    };
    let probe = match &mock {
        Some(m) => m.host.probe(),
        None => probe_from_config(&config),
    };
    let soc_family = config.detection.soc_family.clone();
    let probe = match soc_family {
        Some(family) => probe.with_soc_family(family),
        None => probe,
    };

    let mut registry = DriverRegistry::builtin(probe);

    match cli.command {
        Cmd::Scan => cmd_scan(&mut registry, cli.json)?,
        Cmd::Info => cmd_info(cli.json)?,
        Cmd::List { key } => cmd_list(&mut registry, &key, cli.json)?,
        Cmd::Get { key } => cmd_get(&mut registry, &key, cli.json)?,
        Cmd::Set { key, value } => cmd_set(&mut registry, &key, &value, cli.json)?,
        Cmd::Acquire {
            samplerate,
            duration_ms,
        } => {
            let samplerate = match samplerate {
                Some(s) => Some(parse_rate(&s)?),
                None => config.acquisition.samplerate,
            };
            let duration = duration_ms.unwrap_or(config.acquisition.duration_ms);
            cmd_acquire(&mut registry, samplerate, duration, cli.json).await?
        }
    }

    Ok(())
}

/// Log filter, adjustable once the configuration is known
struct LogControl {
    handle: reload::Handle<EnvFilter, Registry>,
    /// `RUST_LOG` was set and takes precedence over the config
    env_override: bool,
}

impl LogControl {
    fn set_level(&self, level: LogLevel) {
        if self.env_override {
            return;
        }
        if let Err(e) = self.handle.reload(EnvFilter::new(level.as_str())) {
            warn!("Failed to apply log level {}: {}", level.as_str(), e);
        }
    }
}

/// Filter layer from `RUST_LOG`, or `info` until the config says otherwise
fn log_filter(from_env: Option<EnvFilter>) -> (reload::Layer<EnvFilter, Registry>, LogControl) {
    let env_override = from_env.is_some();
    let filter = from_env.unwrap_or_else(|| EnvFilter::new(LogLevel::default().as_str()));
    let (layer, handle) = reload::Layer::new(filter);
    (
        layer,
        LogControl {
            handle,
            env_override,
        },
    )
}

/// Setup logging to stderr
fn setup_logging() -> LogControl {
    let (filter, control) = log_filter(EnvFilter::try_from_default_env().ok());

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    control
}

fn probe_from_config(config: &RaspiLaConfig) -> BoardProbe {
    BoardProbe {
        cpuinfo_path: config.detection.cpuinfo_path.clone(),
        gpiomem_path: config.detection.gpiomem_path.clone(),
        soc_family: None,
    }
}

/// Mock sysroot in a temporary directory, removed on drop
struct MockSysroot {
    host: MockHost,
    _dir: TempDir,
}

impl MockSysroot {
    fn install(name: &str) -> Result<Self> {
        let board = MockBoard::parse(name).ok_or_else(|| {
            let known: Vec<&str> = MockBoard::ALL.iter().map(|b| b.as_str()).collect();
            anyhow!("Unknown mock board '{}' (known: {})", name, known.join(", "))
        })?;
        let dir = tempfile::Builder::new()
            .prefix("raspi-la-mock-")
            .tempdir()
            .context("Failed to create mock sysroot directory")?;
        let host = MockHost::install(dir.path(), board).with_context(|| {
            format!("Failed to create mock sysroot at {}", dir.path().display())
        })?;
        info!("Using mock {} at {}", board.as_str(), dir.path().display());
        Ok(Self { host, _dir: dir })
    }
}

fn driver_mut(registry: &mut DriverRegistry) -> Result<&mut Box<dyn Driver>> {
    registry
        .find_mut(RASPBERRY_PI_1_4.name)
        .ok_or_else(|| anyhow!("Driver {} not registered", RASPBERRY_PI_1_4.name))
}

fn parse_key(key: &str) -> Result<ConfigKey> {
    ConfigKey::parse(key).ok_or_else(|| anyhow!("Unknown config key '{}'", key))
}

fn parse_rate(s: &str) -> Result<u64> {
    ConfigValue::parse_scalar(s)
        .as_u64()
        .ok_or_else(|| anyhow!("Invalid sample rate '{}'", s))
}

/// Scan and take the first device, if any
fn first_device(driver: &mut Box<dyn Driver>) -> Option<DeviceInstance> {
    driver.scan(&[]).into_iter().next()
}

fn require_device(driver: &mut Box<dyn Driver>) -> Result<DeviceInstance> {
    first_device(driver)
        .ok_or_else(|| anyhow!("No {} detected on this host", RASPBERRY_PI_1_4.long_name))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_scan(registry: &mut DriverRegistry, json: bool) -> Result<()> {
    let devices = registry.scan_all();
    let identities: Vec<_> = devices.iter().map(DeviceInstance::identity).collect();

    if json {
        return print_json(&identities);
    }

    println!("Devices: {}", identities.len());
    for (index, id) in identities.iter().enumerate() {
        println!("[{}] {} - {} ({})", index, id.driver, id.model, id.vendor);
        println!("     version {}  serial {}", id.version, id.serial);
        println!(
            "     status {}  samplerate {}",
            id.status,
            format_hz(id.samplerate)
        );
    }
    Ok(())
}

fn cmd_info(json: bool) -> Result<()> {
    let d = &RASPBERRY_PI_1_4;
    if json {
        return print_json(d);
    }

    println!("Driver       : {} ({})", d.name, d.long_name);
    println!("API version  : {}", d.api_version);
    let scan: Vec<&str> = d.scan_options.iter().map(ConfigKey::as_str).collect();
    println!("Scan options : [{}]", scan.join(", "));
    let driver: Vec<&str> = d.driver_options.iter().map(ConfigKey::as_str).collect();
    println!("Driver opts  : [{}]", driver.join(", "));
    for option in d.device_options {
        println!("Device opt   : {} ({})", option.key, option.ops);
    }
    let rates: Vec<String> = d.samplerates.iter().map(|&r| format_hz(r)).collect();
    println!("Samplerates  : {}", rates.join(", "));
    Ok(())
}

fn cmd_list(registry: &mut DriverRegistry, key: &str, json: bool) -> Result<()> {
    let key = parse_key(key)?;
    let driver = driver_mut(registry)?;
    let sdi = first_device(driver);

    let value = driver.config_list(key, sdi.as_ref(), None)?;
    print_value(key, &value, json)
}

fn cmd_get(registry: &mut DriverRegistry, key: &str, json: bool) -> Result<()> {
    let key = parse_key(key)?;
    let driver = driver_mut(registry)?;
    let sdi = first_device(driver);

    let value = driver.config_get(key, sdi.as_ref(), None)?;
    print_value(key, &value, json)
}

fn cmd_set(registry: &mut DriverRegistry, key: &str, value: &str, json: bool) -> Result<()> {
    let key = parse_key(key)?;
    let value = ConfigValue::parse_scalar(value);
    let driver = driver_mut(registry)?;
    let mut sdi = require_device(driver)?;

    driver.config_set(key, &value, &mut sdi, None)?;
    let applied = driver.config_get(key, Some(&sdi), None)?;
    print_value(key, &applied, json)
}

fn print_value(key: ConfigKey, value: &ConfigValue, json: bool) -> Result<()> {
    if json {
        #[derive(Serialize)]
        struct Entry<'a> {
            key: ConfigKey,
            #[serde(flatten)]
            value: &'a ConfigValue,
        }
        return print_json(&Entry { key, value });
    }
    println!("{key} = {value}");
    Ok(())
}

/// Session sink printing every packet on stdout
struct PrintSink {
    json: bool,
}

impl SessionSink for PrintSink {
    fn send(&mut self, packet: Packet) {
        if self.json {
            match serde_json::to_string(&packet) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!("Failed to encode packet: {}", e),
            }
            return;
        }
        match packet {
            Packet::Header {
                feed_version,
                samplerate,
                ..
            } => println!(
                "-> header (feed v{}, {})",
                feed_version,
                format_hz(samplerate)
            ),
            Packet::End { packets_sent } => println!("-> end ({} packets)", packets_sent),
        }
    }
}

async fn cmd_acquire(
    registry: &mut DriverRegistry,
    samplerate: Option<u64>,
    duration_ms: u64,
    json: bool,
) -> Result<()> {
    let driver = driver_mut(registry)?;
    let mut sdi = require_device(driver)?;

    driver.dev_open(&mut sdi)?;

    let result = run_acquisition(&**driver, &mut sdi, samplerate, duration_ms, json).await;

    // Close even when the acquisition failed
    if let Err(e) = driver.dev_close(&mut sdi) {
        warn!("Failed to close device: {}", e);
    }
    result
}

async fn run_acquisition(
    driver: &dyn Driver,
    sdi: &mut DeviceInstance,
    samplerate: Option<u64>,
    duration_ms: u64,
    json: bool,
) -> Result<()> {
    if let Some(rate) = samplerate {
        driver
            .config_set(ConfigKey::Samplerate, &ConfigValue::U64(rate), sdi, None)
            .with_context(|| format!("Cannot use sample rate {}", format_hz(rate)))?;
    }

    driver.acquisition_start(sdi, Box::new(PrintSink { json }))?;

    if duration_ms == 0 {
        info!("Acquiring, press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
    } else {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(duration_ms)) => {}
            res = tokio::signal::ctrl_c() => res?,
        }
    }

    driver.acquisition_stop(sdi)?;

    let counters = sdi.counters();
    if counters.packets_sent < 2 {
        bail!("Stream did not complete");
    }
    Ok(())
}
