//! # Error Types
//!
//! Custom error types for Wheel Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for Wheel Bridge
#[derive(Debug, Error)]
pub enum WheelError {
    /// Degenerate or missing calibration bounds, invalid settings
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Settings file could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Calibration record could not be parsed
    #[error("Calibration record error: {0}")]
    CalibrationRecord(#[from] serde_json::Error),

    /// Malformed handshake framing or out-of-order handshake step
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Value does not fit a signed 16-bit axis report
    #[error("Value {value} does not fit a signed 16-bit axis")]
    Range { value: i64 },

    /// Value outside the percentage conversion domain
    #[error("Value {value} out of range (-32767 .. 32767)")]
    Domain { value: i64 },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial link errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// Serial link reached end of stream
    #[error("Serial link closed by remote device")]
    LinkClosed,

    /// ADC read or setup errors
    #[error("ADC error: {0}")]
    Adc(String),

    /// Virtual joystick creation or emission errors
    #[error("Virtual joystick error: {0}")]
    Joystick(String),
}

impl WheelError {
    /// Per-sample data errors that a loop skips instead of aborting on.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, WheelError::Range { .. } | WheelError::Domain { .. })
    }
}

/// Result type alias for Wheel Bridge
pub type Result<T> = std::result::Result<T, WheelError>;
