//! Wire protocol for the Mavic Mini RC serial link
//!
//! The controller answers a fixed 13-byte ping with a newline-terminated
//! 38-byte status frame carrying the stick and camera-wheel positions as
//! little-endian u16 fields at fixed offsets.

use std::fmt;
use thiserror::Error;

/// The one reverse-engineered ping known to elicit a status frame.
///
/// The protocol has no framing markers beyond this literal pattern; any
/// deviation yields no response (or a malformed one), so the sequence is
/// sent verbatim every cycle.
pub const PING: [u8; 13] = [
    0x55, 0x0d, 0x04, 0x33, 0x0a, 0x0e, 0x03, 0x00, 0x40, 0x06, 0x01, 0xf4, 0x4a,
];

/// Expected length of a status frame, counting the trailing 0x0A delimiter.
pub const RESPONSE_LEN: usize = 38;

/// Errors from frame decoding
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("unexpected frame length {len} (want 38)")]
    UnexpectedLength { len: usize },
}

/// The five logical controller axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    LeftVertical,
    LeftHorizontal,
    RightVertical,
    RightHorizontal,
    Camera,
}

impl Axis {
    /// All axes, in frame-offset order
    pub const ALL: [Axis; 5] = [
        Axis::RightHorizontal,
        Axis::RightVertical,
        Axis::LeftVertical,
        Axis::LeftHorizontal,
        Axis::Camera,
    ];

    /// Byte offset of this axis' u16 field within a status frame
    pub fn offset(self) -> usize {
        match self {
            Axis::RightHorizontal => 7,
            Axis::RightVertical => 10,
            Axis::LeftVertical => 13,
            Axis::LeftHorizontal => 16,
            Axis::Camera => 19,
        }
    }

    /// Short name used on the command line (`-i lv rv ...`)
    pub fn cli_name(self) -> &'static str {
        match self {
            Axis::LeftVertical => "lv",
            Axis::LeftHorizontal => "lh",
            Axis::RightVertical => "rv",
            Axis::RightHorizontal => "rh",
            Axis::Camera => "cam",
        }
    }

    /// Parse a short CLI name
    pub fn from_cli_name(name: &str) -> Option<Axis> {
        Axis::ALL.into_iter().find(|a| a.cli_name() == name)
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

/// Raw (unscaled) axis fields extracted from one status frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawAxes([u16; 5]);

impl RawAxes {
    pub fn get(&self, axis: Axis) -> u16 {
        self.0[axis as usize]
    }
}

/// Decode a status frame into its raw axis fields.
///
/// Only frames of exactly [`RESPONSE_LEN`] bytes are well-formed; anything
/// else (truncated read, concatenated frames, line noise) is rejected
/// whole. There is no checksum beyond the length gate, so a corrupted but
/// correctly-sized frame decodes to garbage values; that limitation is
/// inherited from the observed protocol.
pub fn decode(frame: &[u8]) -> Result<RawAxes, FrameError> {
    if frame.len() != RESPONSE_LEN {
        return Err(FrameError::UnexpectedLength { len: frame.len() });
    }

    let mut raw = [0u16; 5];
    for axis in Axis::ALL {
        let o = axis.offset();
        raw[axis as usize] = u16::from_le_bytes([frame[o], frame[o + 1]]);
    }
    Ok(RawAxes(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_matches_documented_bytes() {
        let hex = "550d04330a0e0300400601f44a";
        let bytes: Vec<u8> = (0..hex.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
            .collect();
        assert_eq!(PING.as_slice(), bytes.as_slice());
    }

    #[test]
    fn test_decode_rejects_wrong_lengths() {
        for len in [0, 1, 37, 39, 76] {
            let frame = vec![0u8; len];
            assert_eq!(decode(&frame), Err(FrameError::UnexpectedLength { len }));
        }
    }

    #[test]
    fn test_decode_extracts_little_endian_fields() {
        let mut frame = [0u8; RESPONSE_LEN];
        frame[7] = 0x00;
        frame[8] = 0x04; // rh = 1024
        frame[10] = 0x6c;
        frame[11] = 0x01; // rv = 364
        frame[13] = 0x94;
        frame[14] = 0x06; // lv = 1684
        frame[16] = 0xbc;
        frame[17] = 0x02; // lh = 700
        frame[19] = 0x4c;
        frame[20] = 0x04; // cam = 1100
        frame[37] = 0x0a;

        let raw = decode(&frame).unwrap();
        assert_eq!(raw.get(Axis::RightHorizontal), 1024);
        assert_eq!(raw.get(Axis::RightVertical), 364);
        assert_eq!(raw.get(Axis::LeftVertical), 1684);
        assert_eq!(raw.get(Axis::LeftHorizontal), 700);
        assert_eq!(raw.get(Axis::Camera), 1100);
    }

    #[test]
    fn test_cli_names_round_trip() {
        for axis in Axis::ALL {
            assert_eq!(Axis::from_cli_name(axis.cli_name()), Some(axis));
        }
        assert_eq!(Axis::from_cli_name("yaw"), None);
    }
}
