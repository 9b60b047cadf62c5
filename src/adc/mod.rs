//! # ADC Module
//!
//! Analog-to-digital converter access for the potentiometer.
//!
//! This module handles:
//! - The [`AdcChannel`] abstraction the sampling loop reads from
//! - A TI ADS1115 driver over any `embedded-hal` I2C bus
//! - Opening the driver on a Linux `/dev/i2c-*` bus

use embedded_hal::i2c::I2c;
use tracing::{debug, info};

use crate::error::{Result, WheelError};

/// Default ADS1115 I2C address (ADDR pin tied to GND).
pub const DEFAULT_ADDRESS: u8 = 0x48;

/// Conversion result register.
const REG_CONVERSION: u8 = 0x00;
/// Configuration register.
const REG_CONFIG: u8 = 0x01;

/// MUX = AIN0 vs GND.
const CONFIG_MUX_AIN0: u16 = 0b100 << 12;
/// MODE = continuous conversion.
const CONFIG_MODE_CONTINUOUS: u16 = 0 << 8;
/// DR = 860 samples per second.
const CONFIG_DR_860SPS: u16 = 0b111 << 5;
/// COMP_QUE = comparator disabled.
const CONFIG_COMP_DISABLE: u16 = 0b11;

/// Source of raw samples for the sampling loop.
#[cfg_attr(test, mockall::automock)]
pub trait AdcChannel: Send {
    /// Reads one raw sample.
    fn read_channel(&mut self) -> Result<i32>;
}

/// Programmable gain amplifier setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gain {
    /// ±6.144 V full scale
    TwoThirds,
    /// ±4.096 V
    One,
    /// ±2.048 V
    Two,
    /// ±1.024 V
    Four,
    /// ±0.512 V
    Eight,
    /// ±0.256 V
    Sixteen,
}

impl Gain {
    /// PGA bits of the configuration register.
    #[must_use]
    pub fn config_bits(self) -> u16 {
        let pga: u16 = match self {
            Gain::TwoThirds => 0b000,
            Gain::One => 0b001,
            Gain::Two => 0b010,
            Gain::Four => 0b011,
            Gain::Eight => 0b100,
            Gain::Sixteen => 0b101,
        };
        pga << 9
    }

    /// Parses the textual gain used in configuration files (`"2/3"`, `"1"`, ...).
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for gains the ADS1115 does not support.
    pub fn parse(text: &str) -> Result<Self> {
        match text.trim() {
            "2/3" => Ok(Gain::TwoThirds),
            "1" => Ok(Gain::One),
            "2" => Ok(Gain::Two),
            "4" => Ok(Gain::Four),
            "8" => Ok(Gain::Eight),
            "16" => Ok(Gain::Sixteen),
            other => Err(WheelError::Configuration(format!(
                "unsupported ADC gain '{}' (expected 2/3, 1, 2, 4, 8 or 16)",
                other
            ))),
        }
    }
}

/// TI ADS1115 reading channel 0 in continuous mode.
pub struct Ads1115<I> {
    i2c: I,
    address: u8,
    gain: Gain,
}

impl<I> std::fmt::Debug for Ads1115<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ads1115")
            .field("address", &format_args!("0x{:02x}", self.address))
            .field("gain", &self.gain)
            .finish_non_exhaustive()
    }
}

impl<I: I2c> Ads1115<I> {
    /// Configures the converter and starts continuous conversion.
    ///
    /// # Errors
    ///
    /// Returns `Adc` if the configuration write fails.
    pub fn new(mut i2c: I, address: u8, gain: Gain) -> Result<Self> {
        let config = Self::config_word(gain);
        let [hi, lo] = config.to_be_bytes();
        i2c.write(address, &[REG_CONFIG, hi, lo]).map_err(|e| {
            WheelError::Adc(format!(
                "Failed to configure ADS1115 at 0x{:02x}: {:?}",
                address, e
            ))
        })?;

        debug!("ADS1115 at 0x{:02x} configured with 0x{:04x}", address, config);
        Ok(Self { i2c, address, gain })
    }

    /// Full configuration register value for the given gain.
    #[must_use]
    pub fn config_word(gain: Gain) -> u16 {
        CONFIG_MUX_AIN0
            | gain.config_bits()
            | CONFIG_MODE_CONTINUOUS
            | CONFIG_DR_860SPS
            | CONFIG_COMP_DISABLE
    }

    /// Releases the underlying bus.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c + Send> AdcChannel for Ads1115<I> {
    fn read_channel(&mut self) -> Result<i32> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[REG_CONVERSION], &mut buf)
            .map_err(|e| WheelError::Adc(format!("Failed to read conversion: {:?}", e)))?;
        Ok(i32::from(i16::from_be_bytes(buf)))
    }
}

/// Opens an ADS1115 on a Linux I2C bus device (e.g. `/dev/i2c-1`).
///
/// # Errors
///
/// Returns `Adc` if the bus cannot be opened or the converter does not respond.
pub fn open_linux(
    bus: &str,
    address: u8,
    gain: Gain,
) -> Result<Ads1115<linux_embedded_hal::I2cdev>> {
    let i2c = linux_embedded_hal::I2cdev::new(bus)
        .map_err(|e| WheelError::Adc(format!("Failed to open {}: {}", bus, e)))?;
    let adc = Ads1115::new(i2c, address, gain)?;
    info!("ADS1115 ready on {} at 0x{:02x} ({:?})", bus, address, gain);
    Ok(adc)
}
