//! # Range Mapping
//!
//! Maps raw ADC samples onto the signed axis range with a held center.
//!
//! The mapping is piecewise linear: samples above the calibrated center use
//! the `[center, max]` span, samples below it use `[min, center]`. The center
//! always lands on exactly 0 no matter how lopsided the two spans are.
//!
//! ```text
//!  min ─────────── center ─────────── max
//!   │                 │                 │
//! -32767              0              32767
//! ```
//!
//! ## Usage
//!
//! ```
//! use wheel_bridge::signal::mapping::{map_axis, CalibrationBounds};
//!
//! let bounds = CalibrationBounds::new(0, 32767, 16384)?;
//! assert_eq!(map_axis(16384, &bounds)?, 0);
//! assert_eq!(map_axis(32767, &bounds)?, 32767);
//! assert_eq!(map_axis(0, &bounds)?, -32767);
//! # Ok::<(), wheel_bridge::error::WheelError>(())
//! ```

use serde::Deserialize;

use super::AXIS_FULL_SCALE;
use crate::error::{Result, WheelError};

/// Default lower calibration bound (raw ADC units).
pub const DEFAULT_MIN: i32 = 0;
/// Default upper calibration bound (raw ADC units).
pub const DEFAULT_MAX: i32 = 32767;
/// Default calibration center (raw ADC units).
pub const DEFAULT_CENTER: i32 = 16384;

/// Calibrated raw range of the sensor.
///
/// Immutable for the lifetime of a sampling session. A valid set of bounds
/// satisfies `min < center < max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CalibrationBounds {
    pub min: i32,
    pub max: i32,
    pub center: i32,
}

impl Default for CalibrationBounds {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN,
            max: DEFAULT_MAX,
            center: DEFAULT_CENTER,
        }
    }
}

impl CalibrationBounds {
    /// Creates validated calibration bounds.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` unless `min < center < max`.
    pub fn new(min: i32, max: i32, center: i32) -> Result<Self> {
        let bounds = Self { min, max, center };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Checks the `min < center < max` invariant.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` describing the violated ordering.
    pub fn validate(&self) -> Result<()> {
        if self.min >= self.center {
            return Err(WheelError::Configuration(format!(
                "calibration min ({}) must be below center ({})",
                self.min, self.center
            )));
        }
        if self.center >= self.max {
            return Err(WheelError::Configuration(format!(
                "calibration center ({}) must be below max ({})",
                self.center, self.max
            )));
        }
        Ok(())
    }

    /// Clamps a raw sample into `[min, max]`.
    #[must_use]
    pub fn clamp(&self, raw: i32) -> i32 {
        raw.clamp(self.min, self.max)
    }
}

/// Maps a clamped raw sample onto `[-32767, 32767]`, holding `center` at 0.
///
/// The caller clamps `raw` into `[bounds.min, bounds.max]` first. Results
/// truncate toward zero.
///
/// # Errors
///
/// Returns `Configuration` when either span is empty (`min == center` or
/// `max == center`), since the mapping has no defined slope there.
pub fn map_axis(raw: i32, bounds: &CalibrationBounds) -> Result<i32> {
    if bounds.max == bounds.center || bounds.min == bounds.center {
        return Err(WheelError::Configuration(format!(
            "degenerate calibration bounds (min {}, center {}, max {})",
            bounds.min, bounds.center, bounds.max
        )));
    }

    let mapped = if raw >= bounds.center {
        map_range(raw, bounds.center, bounds.max, 0, AXIS_FULL_SCALE)
    } else {
        map_range(raw, bounds.min, bounds.center, -AXIS_FULL_SCALE, 0)
    };

    // In range by construction for clamped input; saturate otherwise.
    Ok(mapped.clamp(i64::from(-AXIS_FULL_SCALE), i64::from(AXIS_FULL_SCALE)) as i32)
}

/// Linear interpolation of `x` from `[in_min, in_max]` to `[out_min, out_max]`.
///
/// Evaluated exactly in 64-bit integers as a single fraction so the
/// truncation toward zero applies to the final value, not to a partial term.
fn map_range(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i64 {
    let (x, in_min, in_max) = (i64::from(x), i64::from(in_min), i64::from(in_max));
    let (out_min, out_max) = (i64::from(out_min), i64::from(out_max));

    let span = in_max - in_min;
    let numerator = (x - in_min) * (out_max - out_min) + out_min * span;
    numerator / span
}
