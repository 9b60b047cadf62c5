//! # Configuration Module
//!
//! Handles loading and validating configuration.
//!
//! Two files are involved:
//!
//! - Application settings, a TOML file with one table per subsystem. Every
//!   field has a default, so an empty file (or none at all) is valid.
//! - The calibration record, a flat JSON document holding the ADC address
//!   and the sensor's raw bounds:
//!
//! ```json
//! {"address": "0x48", "calibration": {"min": 0, "max": 32767, "center": 16384}}
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::time::Duration;
use tracing::{info, warn};

use crate::adc::{Gain, DEFAULT_ADDRESS};
use crate::error::{Result, WheelError};
use crate::joystick::Backend;
use crate::serial::session::SessionTiming;
use crate::signal::clamp::ClampBounds;
use crate::signal::mapping::CalibrationBounds;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub pairing: PairingConfig,
    #[serde(default)]
    pub hid: HidConfig,
    #[serde(default)]
    pub adc: AdcConfig,
    #[serde(default)]
    pub joystick: JoystickConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

/// Handshake and calibration sequence timing
#[derive(Debug, Deserialize, Clone)]
pub struct PairingConfig {
    #[serde(default = "default_pair_code_dwell_ms")]
    pub pair_code_dwell_ms: u64,

    #[serde(default = "default_calibration_dwell_ms")]
    pub calibration_dwell_ms: u64,

    #[serde(default = "default_verification_samples")]
    pub verification_samples: usize,

    #[serde(default = "default_review_pause_ms")]
    pub review_pause_ms: u64,

    #[serde(default = "default_joystick_startup_ms")]
    pub joystick_startup_ms: u64,
}

/// HID gadget pipeline configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HidConfig {
    #[serde(default = "default_hid_device")]
    pub device: String,

    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
}

/// ADC configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AdcConfig {
    #[serde(default = "default_i2c_bus")]
    pub i2c_bus: String,

    #[serde(default = "default_gain")]
    pub gain: String,
}

/// Virtual joystick configuration
#[derive(Debug, Deserialize, Clone)]
pub struct JoystickConfig {
    #[serde(default = "default_joystick_name")]
    pub name: String,

    #[serde(default = "default_backend")]
    pub backend: Backend,

    #[serde(default = "default_clamp_min")]
    pub clamp_min: i32,

    #[serde(default = "default_clamp_max")]
    pub clamp_max: i32,
}

// Default value functions
fn default_serial_port() -> String { crate::serial::DEFAULT_PORT.to_string() }
fn default_baud_rate() -> u32 { crate::serial::LINK_BAUD_RATE }
fn default_timeout_ms() -> u64 { 10_000 }
fn default_settle_ms() -> u64 { 1000 }

fn default_pair_code_dwell_ms() -> u64 { 5000 }
fn default_calibration_dwell_ms() -> u64 { 5000 }
fn default_verification_samples() -> usize { 100 }
fn default_review_pause_ms() -> u64 { 4000 }
fn default_joystick_startup_ms() -> u64 { 3000 }

fn default_hid_device() -> String { crate::hid::gadget::DEFAULT_GADGET_DEVICE.to_string() }
fn default_update_interval_ms() -> u64 { 2 }
fn default_smoothing() -> f64 { crate::signal::smoothing::DEFAULT_SMOOTHING }

fn default_i2c_bus() -> String { "/dev/i2c-1".to_string() }
fn default_gain() -> String { "2/3".to_string() }

fn default_joystick_name() -> String { crate::joystick::DEFAULT_DEVICE_NAME.to_string() }
fn default_backend() -> Backend { Backend::Uinput }
fn default_clamp_min() -> i32 { crate::signal::clamp::DRIVER_AXIS_BOUNDS.low }
fn default_clamp_max() -> i32 { crate::signal::clamp::DRIVER_AXIS_BOUNDS.high }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            settle_ms: default_settle_ms(),
        }
    }
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            pair_code_dwell_ms: default_pair_code_dwell_ms(),
            calibration_dwell_ms: default_calibration_dwell_ms(),
            verification_samples: default_verification_samples(),
            review_pause_ms: default_review_pause_ms(),
            joystick_startup_ms: default_joystick_startup_ms(),
        }
    }
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            device: default_hid_device(),
            update_interval_ms: default_update_interval_ms(),
            smoothing: default_smoothing(),
        }
    }
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            i2c_bus: default_i2c_bus(),
            gain: default_gain(),
        }
    }
}

impl Default for JoystickConfig {
    fn default() -> Self {
        Self {
            name: default_joystick_name(),
            backend: default_backend(),
            clamp_min: default_clamp_min(),
            clamp_max: default_clamp_max(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use wheel_bridge::config::Config;
    ///
    /// let config = Config::load("config/wheel.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if any value is out of its valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if ![9600, 19200, 38400, 57600, 115200, 230400].contains(&self.serial.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200, 230400",
            ));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 60_000 {
            return Err(invalid("timeout_ms must be between 1 and 60000"));
        }

        if self.serial.settle_ms > 60_000 {
            return Err(invalid("settle_ms must be at most 60000"));
        }

        for (name, value) in [
            ("pair_code_dwell_ms", self.pairing.pair_code_dwell_ms),
            ("calibration_dwell_ms", self.pairing.calibration_dwell_ms),
            ("review_pause_ms", self.pairing.review_pause_ms),
            ("joystick_startup_ms", self.pairing.joystick_startup_ms),
        ] {
            if value > 60_000 {
                return Err(invalid(format!("{} must be at most 60000", name)));
            }
        }

        if self.pairing.verification_samples == 0 {
            return Err(invalid("verification_samples must be greater than 0"));
        }

        if self.hid.device.is_empty() {
            return Err(invalid("hid device cannot be empty"));
        }

        if self.hid.update_interval_ms == 0 || self.hid.update_interval_ms > 1000 {
            return Err(invalid("update_interval_ms must be between 1 and 1000"));
        }

        if !(self.hid.smoothing > 0.0 && self.hid.smoothing < 1.0) {
            return Err(invalid("smoothing must be strictly between 0.0 and 1.0"));
        }

        if self.adc.i2c_bus.is_empty() {
            return Err(invalid("adc i2c_bus cannot be empty"));
        }

        Gain::parse(&self.adc.gain)?;

        if self.joystick.name.is_empty() {
            return Err(invalid("joystick name cannot be empty"));
        }

        self.clamp_bounds()?;

        Ok(())
    }

    /// Serial read timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.serial.timeout_ms)
    }

    /// Delay between HID reports
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.hid.update_interval_ms)
    }

    /// ADC gain setting
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for unsupported gains
    pub fn gain(&self) -> Result<Gain> {
        Gain::parse(&self.adc.gain)
    }

    /// Driver clamp bounds
    ///
    /// # Errors
    ///
    /// Returns `Configuration` unless `clamp_min < clamp_max` within `i16`
    pub fn clamp_bounds(&self) -> Result<ClampBounds> {
        ClampBounds::new(self.joystick.clamp_min, self.joystick.clamp_max)
    }

    /// Serial session delays
    pub fn session_timing(&self) -> SessionTiming {
        SessionTiming {
            settle: Duration::from_millis(self.serial.settle_ms),
            pair_code_dwell: Duration::from_millis(self.pairing.pair_code_dwell_ms),
            calibration_dwell: Duration::from_millis(self.pairing.calibration_dwell_ms),
            verification_samples: self.pairing.verification_samples,
            review_pause: Duration::from_millis(self.pairing.review_pause_ms),
            joystick_startup: Duration::from_millis(self.pairing.joystick_startup_ms),
        }
    }
}

fn invalid(message: impl Into<String>) -> WheelError {
    WheelError::Configuration(message.into())
}

/// Calibration record as stored on disk
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CalibrationRecord {
    /// ADC I2C address as hex text (e.g. "0x48")
    pub address: String,
    pub calibration: CalibrationBounds,
}

/// Settings for one sampling session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorCalibration {
    pub address: u8,
    pub bounds: CalibrationBounds,
}

impl Default for SensorCalibration {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS,
            bounds: CalibrationBounds::default(),
        }
    }
}

/// Per-value overrides, typically from the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalibrationOverrides {
    pub address: Option<u8>,
    pub min: Option<i32>,
    pub max: Option<i32>,
    pub center: Option<i32>,
}

impl CalibrationRecord {
    /// Load a calibration record from a JSON file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Validated session settings
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for a malformed address or invalid bounds
    pub fn to_sensor(&self) -> Result<SensorCalibration> {
        let address = parse_address(&self.address)?;
        self.calibration.validate()?;
        Ok(SensorCalibration {
            address,
            bounds: self.calibration,
        })
    }
}

/// Default location of the calibration record (`~/.wheel_hid/config.json`)
pub fn default_calibration_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".wheel_hid").join("config.json"))
}

/// Parse an I2C address written in hex, with or without `0x`
///
/// # Errors
///
/// Returns `Configuration` if the text is not a 7-bit hex address
///
/// # Examples
///
/// ```
/// use wheel_bridge::config::parse_address;
///
/// assert_eq!(parse_address("0x48")?, 0x48);
/// assert_eq!(parse_address("4A")?, 0x4A);
/// assert!(parse_address("0x80").is_err());
/// # Ok::<(), wheel_bridge::error::WheelError>(())
/// ```
pub fn parse_address(text: &str) -> Result<u8> {
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    let address = u8::from_str_radix(digits, 16)
        .map_err(|e| invalid(format!("invalid I2C address '{}': {}", text, e)))?;

    if address > 0x7F {
        return Err(invalid(format!("I2C address '{}' exceeds 7 bits", text)));
    }
    Ok(address)
}

/// Resolve the sensor calibration for a sampling session
///
/// A record path that does not exist falls back to defaults with a warning.
/// Overrides are applied last and the result is validated.
///
/// # Errors
///
/// Returns error if an existing record cannot be parsed or the resulting
/// calibration is invalid
pub fn resolve_calibration(
    record_path: Option<&Path>,
    overrides: CalibrationOverrides,
) -> Result<SensorCalibration> {
    let mut sensor = match record_path {
        Some(path) if path.exists() => {
            info!("Loading calibration from {}", path.display());
            CalibrationRecord::load(path)?.to_sensor()?
        }
        Some(path) => {
            warn!("No calibration found at {}, using defaults.", path.display());
            SensorCalibration::default()
        }
        None => SensorCalibration::default(),
    };

    if let Some(address) = overrides.address {
        sensor.address = address;
    }
    if let Some(min) = overrides.min {
        sensor.bounds.min = min;
    }
    if let Some(max) = overrides.max {
        sensor.bounds.max = max;
    }
    if let Some(center) = overrides.center {
        sensor.bounds.center = center;
    }

    sensor.bounds.validate()?;
    Ok(sensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> Config {
        Config::default()
    }

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    // ==================== Settings Tests ====================

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.hid.device, "/dev/hidg0");
        assert_eq!(config.joystick.backend, Backend::Uinput);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp_file = write_temp(
            r#"
[serial]
port = "/dev/ttyACM0"
timeout_ms = 2000

[hid]
smoothing = 0.5

[joystick]
backend = "reclamped"
clamp_max = 32767
"#,
        );

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.read_timeout(), Duration::from_secs(2));
        assert_eq!(config.serial.baud_rate, 115_200);
        assert!((config.hid.smoothing - 0.5).abs() < 1e-12);
        assert_eq!(config.joystick.backend, Backend::Reclamped);
        assert!(config.clamp_bounds().unwrap().is_symmetric());
    }

    #[test]
    fn test_sample_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/wheel.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config.session_timing(), SessionTiming::default());
        assert_eq!(config.clamp_bounds().unwrap(), ClampBounds::default());
        assert_eq!(config.gain().unwrap(), Gain::TwoThirds);
        assert_eq!(config.update_interval(), Duration::from_millis(2));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = Config::load("/nonexistent/wheel.toml");
        assert!(matches!(result, Err(WheelError::Io(_))));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let result = Config::from_toml("[serial\nport = 3");
        assert!(matches!(result, Err(WheelError::Config(_))));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = Config::from_toml("[joystick]\nbackend = \"vjoy2\"\n");
        assert!(matches!(result, Err(WheelError::Config(_))));
    }

    #[test]
    fn test_empty_serial_port() {
        let mut config = create_valid_config();
        config.serial.port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_baud_rate() {
        let mut config = create_valid_config();
        config.serial.baud_rate = 420_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timeout_ms_bounds() {
        let mut config = create_valid_config();
        config.serial.timeout_ms = 0;
        assert!(config.validate().is_err());
        config.serial.timeout_ms = 60_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pairing_delay_too_long() {
        let mut config = create_valid_config();
        config.pairing.calibration_dwell_ms = 60_001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_verification_samples_zero() {
        let mut config = create_valid_config();
        config.pairing.verification_samples = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_update_interval_bounds() {
        let mut config = create_valid_config();
        config.hid.update_interval_ms = 0;
        assert!(config.validate().is_err());
        config.hid.update_interval_ms = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_smoothing_bounds() {
        for smoothing in [0.0, 1.0, -0.2, 1.2] {
            let mut config = create_valid_config();
            config.hid.smoothing = smoothing;
            assert!(config.validate().is_err(), "smoothing {} should be invalid", smoothing);
        }
    }

    #[test]
    fn test_invalid_gain() {
        let mut config = create_valid_config();
        config.adc.gain = "3".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_clamp_bounds() {
        let mut config = create_valid_config();
        config.joystick.clamp_min = 100;
        config.joystick.clamp_max = -100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_session_timing_from_config() {
        let timing = create_valid_config().session_timing();
        assert_eq!(timing, SessionTiming::default());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_serial_port(), "/dev/ttyUSB0");
        assert_eq!(default_baud_rate(), 115_200);
        assert_eq!(default_timeout_ms(), 10_000);
        assert_eq!(default_settle_ms(), 1000);
        assert_eq!(default_pair_code_dwell_ms(), 5000);
        assert_eq!(default_calibration_dwell_ms(), 5000);
        assert_eq!(default_verification_samples(), 100);
        assert_eq!(default_review_pause_ms(), 4000);
        assert_eq!(default_joystick_startup_ms(), 3000);
        assert_eq!(default_hid_device(), "/dev/hidg0");
        assert_eq!(default_update_interval_ms(), 2);
        assert_eq!(default_smoothing(), 0.2);
        assert_eq!(default_i2c_bus(), "/dev/i2c-1");
        assert_eq!(default_gain(), "2/3");
        assert_eq!(default_joystick_name(), "WheelDriver v1.0");
        assert_eq!(default_clamp_min(), -32767);
        assert_eq!(default_clamp_max(), 16383);
    }

    // ==================== Calibration Record Tests ====================

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x48").unwrap(), 0x48);
        assert_eq!(parse_address("0X49").unwrap(), 0x49);
        assert_eq!(parse_address(" 4b ").unwrap(), 0x4B);
        assert!(parse_address("").is_err());
        assert!(parse_address("0xZZ").is_err());
        assert!(parse_address("0x100").is_err());
        assert!(parse_address("0xFF").is_err());
    }

    #[test]
    fn test_load_calibration_record() {
        let temp_file = write_temp(
            r#"{"address": "0x49", "calibration": {"min": 120, "max": 26000, "center": 13100}}"#,
        );

        let record = CalibrationRecord::load(temp_file.path()).unwrap();
        let sensor = record.to_sensor().unwrap();
        assert_eq!(sensor.address, 0x49);
        assert_eq!(sensor.bounds, CalibrationBounds { min: 120, max: 26000, center: 13100 });
    }

    #[test]
    fn test_calibration_record_missing_key() {
        let temp_file = write_temp(r#"{"address": "0x48", "calibration": {"min": 0, "max": 10}}"#);
        let result = CalibrationRecord::load(temp_file.path());
        assert!(matches!(result, Err(WheelError::CalibrationRecord(_))));
    }

    #[test]
    fn test_calibration_record_degenerate_bounds() {
        let record = CalibrationRecord {
            address: "0x48".to_string(),
            calibration: CalibrationBounds { min: 0, max: 100, center: 100 },
        };
        assert!(matches!(record.to_sensor(), Err(WheelError::Configuration(_))));
    }

    #[test]
    fn test_resolve_defaults_without_record() {
        let sensor = resolve_calibration(None, CalibrationOverrides::default()).unwrap();
        assert_eq!(sensor, SensorCalibration::default());
        assert_eq!(sensor.address, 0x48);
    }

    #[test]
    fn test_resolve_missing_record_falls_back() {
        let sensor = resolve_calibration(
            Some(Path::new("/nonexistent/.wheel_hid/config.json")),
            CalibrationOverrides::default(),
        )
        .unwrap();
        assert_eq!(sensor, SensorCalibration::default());
    }

    #[test]
    fn test_resolve_record_with_overrides() {
        let temp_file = write_temp(
            r#"{"address": "0x49", "calibration": {"min": 100, "max": 30000, "center": 15000}}"#,
        );

        let sensor = resolve_calibration(
            Some(temp_file.path()),
            CalibrationOverrides {
                center: Some(14000),
                ..CalibrationOverrides::default()
            },
        )
        .unwrap();

        assert_eq!(sensor.address, 0x49);
        assert_eq!(sensor.bounds, CalibrationBounds { min: 100, max: 30000, center: 14000 });
    }

    #[test]
    fn test_resolve_rejects_invalid_overrides() {
        let result = resolve_calibration(
            None,
            CalibrationOverrides {
                center: Some(40000),
                ..CalibrationOverrides::default()
            },
        );
        assert!(matches!(result, Err(WheelError::Configuration(_))));
    }

    #[test]
    fn test_default_calibration_path() {
        if let Some(path) = default_calibration_path() {
            assert!(path.ends_with(".wheel_hid/config.json"));
        }
    }
}
