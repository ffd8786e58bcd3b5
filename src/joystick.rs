//! Virtual joystick device using evdev/uinput
//!
//! Presents the five RC axes and the toggle button as a standard joystick
//! that games and mapping software can consume.

use crate::protocol::Axis;
use evdev::{
    uinput::{VirtualDevice, VirtualDeviceBuilder},
    AbsInfo, AbsoluteAxisType, AttributeSet, EventType, InputEvent, Key, UinputAbsSetup,
};
use thiserror::Error;

/// Output axis range expected by the virtual device
pub const AXIS_MIN: i32 = 0;
pub const AXIS_MAX: i32 = 32768;
pub const AXIS_CENTER: i32 = 16384;

/// Errors from virtual joystick operations
#[derive(Debug, Error)]
pub enum JoystickError {
    #[error("failed to create virtual device: {0}")]
    CreateDevice(#[source] std::io::Error),
    #[error("failed to emit event: {0}")]
    EmitEvent(#[source] std::io::Error),
}

/// Batch-updating output device for one poll cycle's results
pub trait Sink {
    /// Stage an axis value (published on [`Sink::commit`])
    fn set_axis(&mut self, axis: Axis, value: i32);

    /// Stage the button state
    fn set_button(&mut self, pressed: bool);

    /// Publish all staged updates atomically
    fn commit(&mut self) -> Result<(), JoystickError>;

    /// Neutralize all outputs (axes centered, button released)
    fn reset(&mut self) -> Result<(), JoystickError>;
}

/// Virtual joystick backed by a uinput device
pub struct VirtualJoystick {
    device: VirtualDevice,
    /// Current published axis values, indexed by [`Axis`] (for change detection)
    axis_values: [i32; 5],
    button: bool,
    pending: Vec<InputEvent>,
}

impl VirtualJoystick {
    /// Create the virtual device with all five axes and the toggle button
    pub fn new(name: &str) -> Result<Self, JoystickError> {
        let mut builder = VirtualDeviceBuilder::new()
            .map_err(JoystickError::CreateDevice)?
            .name(name);

        let mut keys = AttributeSet::<Key>::new();
        keys.insert(Key::BTN_TRIGGER);
        builder = builder
            .with_keys(&keys)
            .map_err(JoystickError::CreateDevice)?;

        for axis in Axis::ALL {
            let abs_setup = UinputAbsSetup::new(
                axis_code(axis),
                AbsInfo::new(AXIS_CENTER, AXIS_MIN, AXIS_MAX, 0, 0, 1),
            );
            builder = builder
                .with_absolute_axis(&abs_setup)
                .map_err(JoystickError::CreateDevice)?;
        }

        let device = builder.build().map_err(JoystickError::CreateDevice)?;

        Ok(Self {
            device,
            axis_values: [AXIS_CENTER; 5],
            button: false,
            pending: Vec::new(),
        })
    }

    /// Get the device path (e.g. /dev/input/eventX)
    pub fn device_path(&mut self) -> Option<std::path::PathBuf> {
        self.device
            .enumerate_dev_nodes_blocking()
            .ok()?
            .next()?
            .ok()
    }
}

impl Sink for VirtualJoystick {
    fn set_axis(&mut self, axis: Axis, value: i32) {
        // The mapper deliberately leaves out-of-calibration values
        // unclamped; the device range is enforced here.
        let clamped = value.clamp(AXIS_MIN, AXIS_MAX);
        if self.axis_values[axis as usize] == clamped {
            return;
        }
        self.axis_values[axis as usize] = clamped;
        self.pending.push(InputEvent::new_now(
            EventType::ABSOLUTE,
            axis_code(axis).0,
            clamped,
        ));
    }

    fn set_button(&mut self, pressed: bool) {
        if self.button == pressed {
            return;
        }
        self.button = pressed;
        self.pending.push(InputEvent::new_now(
            EventType::KEY,
            Key::BTN_TRIGGER.code(),
            i32::from(pressed),
        ));
    }

    fn commit(&mut self) -> Result<(), JoystickError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let events = std::mem::take(&mut self.pending);
        self.device.emit(&events).map_err(JoystickError::EmitEvent)
    }

    fn reset(&mut self) -> Result<(), JoystickError> {
        for axis in Axis::ALL {
            self.set_axis(axis, AXIS_CENTER);
        }
        self.set_button(false);
        self.commit()
    }
}

/// Map a logical axis to its evdev code
fn axis_code(axis: Axis) -> AbsoluteAxisType {
    match axis {
        Axis::LeftHorizontal => AbsoluteAxisType::ABS_X,
        Axis::LeftVertical => AbsoluteAxisType::ABS_Y,
        Axis::RightHorizontal => AbsoluteAxisType::ABS_RX,
        Axis::RightVertical => AbsoluteAxisType::ABS_RY,
        Axis::Camera => AbsoluteAxisType::ABS_Z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires uinput access (run with: cargo test -- --ignored)
    fn test_create_joystick() {
        let joystick = VirtualJoystick::new("Test Mavic Bridge");
        assert!(joystick.is_ok());
    }

    #[test]
    fn test_axis_codes_are_distinct() {
        let mut codes: Vec<u16> = Axis::ALL.iter().map(|&a| axis_code(a).0).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 5);
    }
}
