//! Raw-field-to-axis value mapping
//!
//! Converts the raw u16 fields from a status frame into the virtual
//! joystick's output range, with optional per-axis inversion.

use crate::joystick::AXIS_MAX;
use crate::protocol::{Axis, RawAxes};
use thiserror::Error;

/// Calibrated raw range of the sticks (observed on the device)
pub const RAW_MIN: u16 = 364;
pub const RAW_CENTER: u16 = 1024;
pub const RAW_MAX: u16 = 1684;

/// Scale a raw field into the output range.
///
/// `(raw - 364) * 4096 / 165` with floor division maps the calibrated
/// range [364, 1684] onto [0, 32768], center 1024 onto 16384. Raw values
/// outside the calibrated range intentionally produce out-of-range output;
/// clamping here would mask receiver miscalibration, so it is left to the
/// output device.
pub fn scale(raw: u16, inverted: bool) -> i32 {
    let value = (i32::from(raw) - i32::from(RAW_MIN)) * 4096;
    let output = value.div_euclid(165);
    if inverted {
        AXIS_MAX - output
    } else {
        output
    }
}

/// Unknown axis name on the command line
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown axis name '{0}' (expected lv, lh, rv, rh, or cam)")]
pub struct UnknownAxis(pub String);

/// The set of axes whose output is mirrored about the midpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvertSet([bool; 5]);

impl InvertSet {
    pub const fn empty() -> Self {
        InvertSet([false; 5])
    }

    /// Parse CLI short names into an invert set
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, UnknownAxis> {
        let mut set = InvertSet::empty();
        for name in names {
            let name = name.as_ref();
            let axis = Axis::from_cli_name(name).ok_or_else(|| UnknownAxis(name.to_string()))?;
            set.0[axis as usize] = true;
        }
        Ok(set)
    }

    pub fn contains(&self, axis: Axis) -> bool {
        self.0[axis as usize]
    }
}

impl Default for InvertSet {
    /// The stock controller reports both vertical sticks upside down
    fn default() -> Self {
        InvertSet::parse(&["lv", "rv"]).unwrap()
    }
}

/// Applies scaling and inversion to a decoded frame
#[derive(Debug, Clone, Copy)]
pub struct AxisMapper {
    invert: InvertSet,
}

impl AxisMapper {
    pub fn new(invert: InvertSet) -> Self {
        Self { invert }
    }

    /// Compute the output value for every axis of one frame
    pub fn map(&self, raw: &RawAxes) -> [(Axis, i32); 5] {
        Axis::ALL.map(|axis| (axis, scale(raw.get(axis), self.invert.contains(axis))))
    }
}
