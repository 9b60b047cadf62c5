//! # Serial Communication Module
//!
//! Handles the serial link to the remote microcontroller reading the sensor.
//!
//! This module handles:
//! - Opening the serial port at 115,200 baud, 8N1, no flow control
//! - Line-oriented reads with a read timeout
//! - The pairing handshake and the guided calibration sequence
//! - Parsing one integer sample per line

pub mod calibration;
pub mod handshake;
pub mod port_trait;
pub mod session;

use tokio::time::Duration;
use tokio_serial::{SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::{debug, info};

use crate::error::{Result, WheelError};
pub use port_trait::{LineLink, StreamLink};

/// Baud rate the remote board streams at
pub const LINK_BAUD_RATE: u32 = 115_200;

/// Default serial device
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// Default line read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Serial link to the remote board
pub type SerialLink = StreamLink<SerialStream>;

/// Open a serial port with the link settings
///
/// DTR and RTS are dropped right after opening so the board is not held in
/// reset.
///
/// # Arguments
///
/// * `path` - Device path (e.g., "/dev/ttyUSB0")
/// * `baud_rate` - Line speed
/// * `read_timeout` - Per-line read timeout
///
/// # Errors
///
/// Returns `Serial` if the port cannot be opened or configured
///
/// # Examples
///
/// ```no_run
/// use wheel_bridge::serial::{open_port, LINK_BAUD_RATE, DEFAULT_READ_TIMEOUT};
///
/// let link = open_port("/dev/ttyUSB0", LINK_BAUD_RATE, DEFAULT_READ_TIMEOUT)?;
/// # Ok::<(), wheel_bridge::error::WheelError>(())
/// ```
pub fn open_port(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<SerialLink> {
    debug!("Opening serial port: {}", path);

    let mut port = tokio_serial::new(path, baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .parity(tokio_serial::Parity::None)
        .stop_bits(tokio_serial::StopBits::One)
        .flow_control(tokio_serial::FlowControl::None)
        .timeout(read_timeout)
        .open_native_async()
        .map_err(|e| WheelError::Serial(format!("Failed to open {}: {}", path, e)))?;

    port.write_data_terminal_ready(false)
        .map_err(|e| WheelError::Serial(format!("Failed to clear DTR on {}: {}", path, e)))?;
    port.write_request_to_send(false)
        .map_err(|e| WheelError::Serial(format!("Failed to clear RTS on {}: {}", path, e)))?;

    info!("Opened serial link at {} ({} baud)", path, baud_rate);
    Ok(StreamLink::new(port, read_timeout))
}

/// Classified content of one data line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleLine {
    /// Nothing but whitespace (or a timed-out read)
    Empty,
    /// An integer sample
    Value(i32),
    /// Anything else, trimmed
    Invalid(String),
}

/// Parse one received line as an integer sample
///
/// # Examples
///
/// ```
/// use wheel_bridge::serial::{parse_sample, SampleLine};
///
/// assert_eq!(parse_sample("-1234\r\n"), SampleLine::Value(-1234));
/// assert_eq!(parse_sample("\r\n"), SampleLine::Empty);
/// assert_eq!(parse_sample("hello\n"), SampleLine::Invalid("hello".to_string()));
/// ```
pub fn parse_sample(line: &str) -> SampleLine {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return SampleLine::Empty;
    }
    match trimmed.parse::<i32>() {
        Ok(value) => SampleLine::Value(value),
        Err(_) => SampleLine::Invalid(trimmed.to_string()),
    }
}
