//! Pan Tracker Application
//!
//! Drives a pan motor from tracked-subject positions published on an MQTT
//! broker. It uses the pan-tracker-core library for all decisions and adds:
//! - Configuration file + command line overrides
//! - Serial link to the motor controller
//! - Message bus subscription and payload decoding
//! - Calibration timer and bench test mode

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod bus;
mod config;
mod runtime;
mod serial;

/// Pan Tracker - follow tracked subjects with a pan motor
#[derive(Parser, Debug)]
#[command(name = "pan-tracker")]
#[command(about = "Drive a pan motor from tracked subject bearings", long_about = None)]
#[command(version)]
struct Args {
    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial device of the motor controller
    #[arg(long, value_name = "DEVICE")]
    port: Option<String>,

    /// Serial baud rate
    #[arg(long, value_name = "BAUD")]
    baudrate: Option<u32>,

    /// Milliseconds to wait before setting the zero point
    #[arg(long, value_name = "MS")]
    wait_to_zero: Option<u64>,

    /// Send random angles for bench testing
    #[arg(long)]
    test_mode: bool,

    /// Do not flip the bearing direction
    #[arg(long)]
    no_flip: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => config::AppConfig::default(),
    };
    apply_overrides(&mut config, &args);
    config.validate()?;

    // Initialize logging
    init_logging(log_level(&config, args.verbose, args.quiet)?);

    log::info!("{} v{}", config.app_name, env!("CARGO_PKG_VERSION"));
    log::info!("Using core library v{}", pan_tracker_core::VERSION);
    log::info!("started with config {:?}", config.redacted());
    log::debug!("Debug logging enabled; output could be verbose!");

    runtime::run(config).await
}

/// Command line flags win over the configuration file
fn apply_overrides(config: &mut config::AppConfig, args: &Args) {
    if let Some(port) = &args.port {
        config.serial.port = port.clone();
    }
    if let Some(baudrate) = args.baudrate {
        config.serial.baudrate = baudrate;
    }
    if let Some(ms) = args.wait_to_zero {
        config.wait_to_zero = ms;
    }
    if args.test_mode {
        config.test_mode = true;
    }
    if args.no_flip {
        config.flip_direction = false;
    }
}

fn log_level(config: &config::AppConfig, verbose: u8, quiet: bool) -> Result<log::LevelFilter> {
    use log::LevelFilter;

    Ok(if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => config.log_level()?,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    })
}

/// Initialize logging at the given level
fn init_logging(level: log::LevelFilter) {
    use env_logger::Builder;
    use std::io::Write;

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
