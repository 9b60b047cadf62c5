//! # Driver Range Clamping
//!
//! Re-ranges raw serial samples into the domain accepted by a virtual
//! joystick driver.
//!
//! The default bounds, `-32767 ..= 16383`, are asymmetric: the upper limit is
//! half the magnitude of the lower one. This reproduces the range the driver
//! backend has always been fed and is most likely a calibration slip (a
//! symmetric `-32767 ..= 32767` was probably intended). The bounds are
//! therefore a named value that configuration can override.

use serde::Deserialize;

use crate::error::{Result, WheelError};

/// Inclusive bounds a driver accepts for its axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ClampBounds {
    pub low: i32,
    pub high: i32,
}

/// Default driver domain. Asymmetric, see the module docs.
pub const DRIVER_AXIS_BOUNDS: ClampBounds = ClampBounds {
    low: -32767,
    high: 16383,
};

/// Symmetric full-scale domain.
pub const SYMMETRIC_AXIS_BOUNDS: ClampBounds = ClampBounds {
    low: -32767,
    high: 32767,
};

impl Default for ClampBounds {
    fn default() -> Self {
        DRIVER_AXIS_BOUNDS
    }
}

impl ClampBounds {
    /// Creates validated bounds.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` unless `low < high` and both fit in `i16`.
    pub fn new(low: i32, high: i32) -> Result<Self> {
        let in_i16 = |v: i32| i16::try_from(v).is_ok();
        if !in_i16(low) || !in_i16(high) {
            return Err(WheelError::Configuration(format!(
                "clamp bounds {}..={} must fit a signed 16-bit axis",
                low, high
            )));
        }
        if low >= high {
            return Err(WheelError::Configuration(format!(
                "clamp lower bound {} must be below upper bound {}",
                low, high
            )));
        }
        Ok(Self { low, high })
    }

    /// Whether the bounds are mirrored around zero.
    #[must_use]
    pub fn is_symmetric(&self) -> bool {
        self.high.checked_neg() == Some(self.low)
    }
}

/// Clamps `value` into `bounds`.
#[must_use]
pub fn reclamp(value: i32, bounds: ClampBounds) -> i32 {
    value.clamp(bounds.low, bounds.high)
}
