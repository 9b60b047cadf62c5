//! # Axis Report Encoder
//!
//! Packs an axis value into the 2-byte report the HID gadget expects:
//! signed 16-bit, two's complement, little-endian.

use crate::error::{Result, WheelError};

/// Size of one axis report in bytes.
pub const AXIS_REPORT_SIZE: usize = 2;

/// One encoded axis report.
pub type AxisReport = [u8; AXIS_REPORT_SIZE];

/// Encodes `value` as a little-endian signed 16-bit report.
///
/// # Errors
///
/// Returns `Range` if `value` does not fit in `[-32768, 32767]`.
///
/// # Examples
///
/// ```
/// use wheel_bridge::hid::report::encode_axis_report;
///
/// assert_eq!(encode_axis_report(0)?, [0x00, 0x00]);
/// assert_eq!(encode_axis_report(-1)?, [0xFF, 0xFF]);
/// assert_eq!(encode_axis_report(0x1234)?, [0x34, 0x12]);
/// # Ok::<(), wheel_bridge::error::WheelError>(())
/// ```
pub fn encode_axis_report(value: i64) -> Result<AxisReport> {
    let value = i16::try_from(value).map_err(|_| WheelError::Range { value })?;
    Ok(value.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_zero() {
        assert_eq!(encode_axis_report(0).unwrap(), [0x00, 0x00]);
    }

    #[test]
    fn test_encode_minus_one() {
        assert_eq!(encode_axis_report(-1).unwrap(), [0xFF, 0xFF]);
    }

    #[test]
    fn test_encode_extremes() {
        assert_eq!(encode_axis_report(32767).unwrap(), [0xFF, 0x7F]);
        assert_eq!(encode_axis_report(-32767).unwrap(), [0x01, 0x80]);
        assert_eq!(encode_axis_report(-32768).unwrap(), [0x00, 0x80]);
    }

    #[test]
    fn test_encode_is_little_endian() {
        assert_eq!(encode_axis_report(256).unwrap(), [0x00, 0x01]);
        assert_eq!(encode_axis_report(16382).unwrap(), [0xFE, 0x3F]);
    }

    #[test]
    fn test_encode_out_of_range() {
        for value in [32768, -32769, i64::from(i32::MAX), i64::MIN] {
            match encode_axis_report(value) {
                Err(WheelError::Range { value: v }) => assert_eq!(v, value),
                other => panic!("Expected Range error for {}, got: {:?}", value, other),
            }
        }
    }
}
