//! # Wheel Bridge
//!
//! Turn a steering sensor into a game controller axis.
//!
//! ```bash
//! # ADS1115 → USB HID gadget
//! wheel-bridge hid --calibration
//!
//! # Serial microcontroller → virtual joystick
//! wheel-bridge serial --port /dev/ttyACM0
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use wheel_bridge::adc;
use wheel_bridge::config::{
    default_calibration_path, parse_address, resolve_calibration, CalibrationOverrides, Config,
};
use wheel_bridge::hid::{HidGadget, SamplingLoop};
use wheel_bridge::joystick::{open_backend, Backend};
use wheel_bridge::serial::{open_port, session};
use wheel_bridge::signal::smoothing::Smoother;

/// Exit status of the HID gadget pipeline on failure
const HID_FAILURE_EXIT_CODE: i32 = 1;

/// Exit status of the serial pipeline on failure
const SERIAL_FAILURE_EXIT_CODE: i32 = 666;

#[derive(Debug, Parser)]
#[command(name = "wheel-bridge", version)]
#[command(about = "Steering sensor to HID gadget / virtual joystick bridge")]
struct Cli {
    /// Application settings (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sample the ADC and write reports to the HID gadget
    Hid(HidArgs),
    /// Pair with the serial wheel and drive a virtual joystick
    Serial(SerialArgs),
}

#[derive(Debug, Args)]
struct HidArgs {
    /// Load a calibration record (defaults to ~/.wheel_hid/config.json)
    #[arg(long, value_name = "PATH")]
    calibration: Option<Option<PathBuf>>,

    /// ADC I2C address in hex
    #[arg(long, value_parser = parse_address)]
    address: Option<u8>,

    #[arg(long, allow_negative_numbers = true)]
    min: Option<i32>,

    #[arg(long, allow_negative_numbers = true)]
    max: Option<i32>,

    #[arg(long, allow_negative_numbers = true)]
    center: Option<i32>,
}

#[derive(Debug, Args)]
struct SerialArgs {
    /// Serial device (overrides the configured port)
    #[arg(long)]
    port: Option<String>,

    /// Print percentage readings instead of driving a joystick
    #[arg(long)]
    monitor: bool,

    /// Virtual joystick backend (overrides the configured backend)
    #[arg(long, value_enum)]
    backend: Option<Backend>,
}

impl Commands {
    fn failure_exit_code(&self) -> i32 {
        match self {
            Commands::Hid(_) => HID_FAILURE_EXIT_CODE,
            Commands::Serial(_) => SERIAL_FAILURE_EXIT_CODE,
        }
    }
}

impl HidArgs {
    fn record_path(&self) -> Option<PathBuf> {
        match &self.calibration {
            None => None,
            Some(Some(path)) => Some(path.clone()),
            Some(None) => default_calibration_path(),
        }
    }

    fn overrides(&self) -> CalibrationOverrides {
        CalibrationOverrides {
            address: self.address,
            min: self.min,
            max: self.max,
            center: self.center,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let guard = init_logging(cli.verbose);

    info!("Wheel Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let failure_code = cli.command.failure_exit_code();
    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            error!("{:#}", e);
            failure_code
        }
    };

    // Flush buffered log lines before exiting
    drop(guard);
    std::process::exit(code);
}

fn init_logging(verbose: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(writer)
        .init();

    guard
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Hid(args) => run_hid(&config, &args).await,
        Commands::Serial(args) => run_serial(&config, &args).await,
    }
}

async fn run_hid(config: &Config, args: &HidArgs) -> Result<()> {
    let sensor = resolve_calibration(args.record_path().as_deref(), args.overrides())
        .context("Invalid calibration")?;
    info!(
        "Calibration: address 0x{:02x}, min {}, max {}, center {}",
        sensor.address, sensor.bounds.min, sensor.bounds.max, sensor.bounds.center
    );

    let adc = adc::open_linux(&config.adc.i2c_bus, sensor.address, config.gain()?)
        .context("Failed to initialize ADC")?;
    let gadget = HidGadget::open(&config.hid.device)
        .await
        .context("Failed to open HID gadget")?;
    let smoother = Smoother::new(config.hid.smoothing)?;

    let mut sampling = SamplingLoop::new(
        adc,
        gadget,
        sensor.bounds,
        smoother,
        config.update_interval(),
    )?;

    info!("Press Ctrl+C to exit");
    sampling.run(shutdown_signal()).await?;
    info!("Total reports written: {}", sampling.reports_written());
    Ok(())
}

async fn run_serial(config: &Config, args: &SerialArgs) -> Result<()> {
    let port = args.port.as_deref().unwrap_or(&config.serial.port);
    let link = open_port(port, config.serial.baud_rate, config.read_timeout())
        .with_context(|| format!("Failed to open serial port {}", port))?;
    info!("Listening on {}", port);

    let timing = config.session_timing();

    if args.monitor {
        session::run_monitor(link, timing, shutdown_signal()).await?;
        return Ok(());
    }

    let backend = args.backend.unwrap_or(config.joystick.backend);
    let bounds = config.clamp_bounds()?;
    if backend == Backend::Reclamped && !bounds.is_symmetric() {
        warn!(
            "Clamping axis to asymmetric range [{}, {}]",
            bounds.low, bounds.high
        );
    }

    let name = config.joystick.name.clone();
    session::run_bridge(
        link,
        timing,
        move || open_backend(backend, &name, bounds),
        shutdown_signal(),
    )
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down..."),
        Err(e) => {
            warn!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
