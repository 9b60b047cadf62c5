//! # Virtual Joystick Module
//!
//! Forwards serial samples to the host's virtual joystick subsystem.
//!
//! Two backends share one capability, [`VirtualJoystick`], and differ only
//! in how a raw sample becomes an axis value:
//!
//! | Backend | Conversion | Accepted domain |
//! |---------|------------|-----------------|
//! | `uinput` | [`direct_axis_value`] | -32768 ..= 32767 |
//! | `reclamped` | [`reclamp`] with [`ClampBounds`] | `-32767 ..= 16383` by default |
//!
//! The backend is chosen once at startup.

pub mod emission;
pub mod uinput;

use serde::Deserialize;

use crate::error::{Result, WheelError};
use crate::signal::clamp::{reclamp, ClampBounds};

pub use emission::EmissionLoop;
pub use uinput::UinputAxis;

/// Default virtual device name
pub const DEFAULT_DEVICE_NAME: &str = "WheelDriver v1.0";

/// Single-axis output device
pub trait AxisDevice: Send {
    /// Sets the axis to `value` and synchronizes the device.
    fn set_axis(&mut self, value: i32) -> Result<()>;
}

/// Virtual joystick accepting raw serial samples
pub trait VirtualJoystick: Send {
    /// Converts `raw` for this backend and emits it. Returns the emitted value.
    fn emit(&mut self, raw: i32) -> Result<i32>;

    /// Backend kind
    fn backend(&self) -> Backend;
}

impl<J: VirtualJoystick + ?Sized> VirtualJoystick for Box<J> {
    fn emit(&mut self, raw: i32) -> Result<i32> {
        (**self).emit(raw)
    }

    fn backend(&self) -> Backend {
        (**self).backend()
    }
}

/// Virtual joystick backend selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Kernel input device, raw values passed through
    Uinput,
    /// Driver domain, values re-ranged through the clamp bounds
    Reclamped,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Uinput => write!(f, "uinput"),
            Backend::Reclamped => write!(f, "reclamped"),
        }
    }
}

/// Passes a raw sample through unchanged if it fits a signed 16-bit axis.
///
/// # Errors
///
/// Returns `Range` for values outside `[-32768, 32767]`.
pub fn direct_axis_value(raw: i32) -> Result<i32> {
    i16::try_from(raw)
        .map(i32::from)
        .map_err(|_| WheelError::Range {
            value: i64::from(raw),
        })
}

/// Kernel-level joystick: raw samples go straight to the axis
pub struct KernelJoystick<D> {
    device: D,
}

impl<D: AxisDevice> KernelJoystick<D> {
    pub fn new(device: D) -> Self {
        Self { device }
    }
}

impl<D: AxisDevice> VirtualJoystick for KernelJoystick<D> {
    fn emit(&mut self, raw: i32) -> Result<i32> {
        let value = direct_axis_value(raw)?;
        self.device.set_axis(value)?;
        Ok(value)
    }

    fn backend(&self) -> Backend {
        Backend::Uinput
    }
}

/// Driver-domain joystick: samples are clamped into `bounds` first
pub struct ReclampedJoystick<D> {
    device: D,
    bounds: ClampBounds,
}

impl<D: AxisDevice> ReclampedJoystick<D> {
    pub fn new(device: D, bounds: ClampBounds) -> Self {
        Self { device, bounds }
    }
}

impl<D: AxisDevice> VirtualJoystick for ReclampedJoystick<D> {
    fn emit(&mut self, raw: i32) -> Result<i32> {
        let value = reclamp(raw, self.bounds);
        self.device.set_axis(value)?;
        Ok(value)
    }

    fn backend(&self) -> Backend {
        Backend::Reclamped
    }
}

/// Creates the virtual device and wraps it in the requested backend.
///
/// # Errors
///
/// Returns `Joystick` if the uinput device cannot be created.
pub fn open_backend(
    backend: Backend,
    name: &str,
    bounds: ClampBounds,
) -> Result<Box<dyn VirtualJoystick>> {
    let device = UinputAxis::create(name)?;
    Ok(match backend {
        Backend::Uinput => Box::new(KernelJoystick::new(device)),
        Backend::Reclamped => Box::new(ReclampedJoystick::new(device, bounds)),
    })
}
