//! # Signal Conditioning Module
//!
//! Pure conversions between raw sensor samples and axis values.
//!
//! This module handles:
//! - Center-preserving range mapping of ADC samples
//! - Exponential smoothing of mapped values
//! - Percentage conversion for operator readouts
//! - Re-ranging values into a virtual joystick driver's domain

pub mod clamp;
pub mod mapping;
pub mod percent;
pub mod smoothing;

/// Largest axis magnitude produced by the mapping (symmetric around zero).
pub const AXIS_FULL_SCALE: i32 = 32767;
