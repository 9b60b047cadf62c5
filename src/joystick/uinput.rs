//! Kernel virtual joystick via evdev/uinput

use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisType, EventType, InputEvent, UinputAbsSetup,
};
use tracing::info;

use super::AxisDevice;
use crate::error::{Result, WheelError};

/// Axis range advertised by the virtual device
pub const UINPUT_AXIS_MIN: i32 = -32768;
/// Axis range advertised by the virtual device
pub const UINPUT_AXIS_MAX: i32 = 32767;

/// Single `ABS_Y` axis on a uinput device
pub struct UinputAxis {
    device: VirtualDevice,
    name: String,
}

impl std::fmt::Debug for UinputAxis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UinputAxis")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl UinputAxis {
    /// Creates the virtual device
    ///
    /// # Arguments
    ///
    /// * `name` - Device name shown to games and `evtest`
    ///
    /// # Errors
    ///
    /// Returns `Joystick` if `/dev/uinput` is unavailable or rejects the setup
    pub fn create(name: &str) -> Result<Self> {
        let abs_setup = UinputAbsSetup::new(
            AbsoluteAxisType::ABS_Y,
            AbsInfo::new(0, UINPUT_AXIS_MIN, UINPUT_AXIS_MAX, 0, 0, 0),
        );

        let device = VirtualDeviceBuilder::new()
            .and_then(|builder| builder.name(name).with_absolute_axis(&abs_setup))
            .and_then(|builder| builder.build())
            .map_err(|e| WheelError::Joystick(format!("Failed to create virtual device: {}", e)))?;

        info!("Virtual wheel '{}' started.", name);
        Ok(Self {
            device,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl AxisDevice for UinputAxis {
    fn set_axis(&mut self, value: i32) -> Result<()> {
        let event = InputEvent::new_now(EventType::ABSOLUTE, AbsoluteAxisType::ABS_Y.0, value);
        // emit() appends the SYN_REPORT
        self.device
            .emit(&[event])
            .map_err(|e| WheelError::Joystick(format!("Failed to emit event: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_range() {
        assert_eq!(UINPUT_AXIS_MIN, i32::from(i16::MIN));
        assert_eq!(UINPUT_AXIS_MAX, i32::from(i16::MAX));
    }

    // Requires write access to /dev/uinput
    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_create_with_real_uinput() {
        match UinputAxis::create("wheel-bridge test") {
            Ok(mut axis) => {
                assert_eq!(axis.name(), "wheel-bridge test");
                axis.set_axis(1234).unwrap();
                axis.set_axis(-1234).unwrap();
            }
            Err(e) => println!("uinput unavailable (this is OK for CI/CD): {}", e),
        }
    }
}
