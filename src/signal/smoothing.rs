//! # Exponential Smoothing
//!
//! Single-pole IIR filter over successive mapped axis values:
//!
//! `output = previous * alpha + mapped * (1 - alpha)`
//!
//! Higher `alpha` weights the previous output more heavily (more damping,
//! more lag). A constant input is a fixed point for every `alpha` in `(0, 1)`.

use crate::error::{Result, WheelError};

/// Default smoothing coefficient.
pub const DEFAULT_SMOOTHING: f64 = 0.2;

/// One smoothing step. `previous` carries the `alpha` weight.
#[must_use]
#[inline]
pub fn smooth(previous: f64, mapped: i32, alpha: f64) -> f64 {
    previous * alpha + f64::from(mapped) * (1.0 - alpha)
}

/// Smoothing accumulator owned by a sampling loop.
///
/// Starts at 0.0 and is only reset by constructing a new one.
#[derive(Debug, Clone, Copy)]
pub struct Smoother {
    alpha: f64,
    last: f64,
}

impl Smoother {
    /// Creates a smoother with the given coefficient.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` unless `alpha` lies strictly inside `(0, 1)`.
    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(WheelError::Configuration(format!(
                "smoothing coefficient must be inside (0, 1), got {}",
                alpha
            )));
        }
        Ok(Self { alpha, last: 0.0 })
    }

    /// Folds a mapped value into the accumulator and returns the new output.
    pub fn update(&mut self, mapped: i32) -> f64 {
        self.last = smooth(self.last, mapped, self.alpha);
        self.last
    }

    /// Most recent output.
    #[must_use]
    pub fn last(&self) -> f64 {
        self.last
    }

    /// Configured coefficient.
    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}
