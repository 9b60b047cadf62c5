//! # Percentage Conversion
//!
//! Expresses a signed sample as a percentage of full scale for operator
//! readouts during calibration and monitoring.

use super::AXIS_FULL_SCALE;
use crate::error::{Result, WheelError};

/// Converts a sample to a percentage of full scale (`value / 32767 * 100`).
///
/// # Errors
///
/// Returns `Domain` if `value` is outside `[-32767, 32767]`.
///
/// # Examples
///
/// ```
/// use wheel_bridge::signal::percent::to_percent;
///
/// assert_eq!(to_percent(32767)?, 100.0);
/// assert_eq!(to_percent(-32767)?, -100.0);
/// assert!(to_percent(40000).is_err());
/// # Ok::<(), wheel_bridge::error::WheelError>(())
/// ```
pub fn to_percent(value: i32) -> Result<f64> {
    if !(-AXIS_FULL_SCALE..=AXIS_FULL_SCALE).contains(&value) {
        return Err(WheelError::Domain {
            value: i64::from(value),
        });
    }

    Ok(f64::from(value) / f64::from(AXIS_FULL_SCALE) * 100.0)
}
