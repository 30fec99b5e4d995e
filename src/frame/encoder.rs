//! # Frame Encoder
//!
//! Renders a [`ControlFrame`] for the wire and for the console.
//!
//! ## Wire format
//!
//! One compact JSON object per line, terminated by a single `\n`:
//!
//! ```text
//! {"device":{"name":"RadioMaster Pocket Joystick","index":0,"guid":"0300…","timestamp":"2024-05-17T14:03:09+02:00"},"left_stick":{"yaw":-0.5,"throttle":0.75},"right_stick":{"pitch":0.0,"roll":0.0}}
//! ```
//!
//! Channel values are rounded to the configured number of decimals.

use serde::Serialize;

use super::control::{AxisMapping, ControlFrame};
use crate::error::Result;

/// Timestamp layout: ISO-8601 with local offset.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Frame delimiter on the wire.
pub const FRAME_DELIMITER: u8 = b'\n';

#[derive(Debug, Serialize)]
struct WireFrame<'a> {
    device: WireDevice<'a>,
    left_stick: LeftStick,
    right_stick: RightStick,
}

#[derive(Debug, Serialize)]
struct WireDevice<'a> {
    name: &'a str,
    index: usize,
    guid: &'a str,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct LeftStick {
    yaw: f64,
    throttle: f64,
}

#[derive(Debug, Serialize)]
struct RightStick {
    pitch: f64,
    roll: f64,
}

/// Rounds to a number of decimals, folding `-0.0` into `0.0`.
#[must_use]
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Encoder for wire lines, console payloads and the status block.
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    precision: u32,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(3)
    }
}

impl FrameEncoder {
    /// Creates an encoder keeping `precision` decimals.
    #[must_use]
    pub fn new(precision: u32) -> Self {
        Self { precision }
    }

    /// Decimals kept for channel values.
    pub fn precision(&self) -> u32 {
        self.precision
    }

    fn wire<'a>(&self, frame: &'a ControlFrame) -> WireFrame<'a> {
        WireFrame {
            device: WireDevice {
                name: &frame.device_name,
                index: frame.device_index,
                guid: &frame.guid,
                timestamp: frame.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            },
            left_stick: LeftStick {
                yaw: round_to(frame.yaw, self.precision),
                throttle: round_to(frame.throttle, self.precision),
            },
            right_stick: RightStick {
                pitch: round_to(frame.pitch, self.precision),
                roll: round_to(frame.roll, self.precision),
            },
        }
    }

    /// Encodes a frame as one newline-terminated line.
    ///
    /// # Errors
    ///
    /// Returns [`Encode`](crate::error::BridgeError::Encode) if JSON
    /// serialization fails.
    pub fn encode_line(&self, frame: &ControlFrame) -> Result<Vec<u8>> {
        let json = serde_json::to_string(&self.wire(frame))?;
        let mut line: Vec<u8> = json
            .into_bytes()
            .into_iter()
            .filter(|b| *b != b'\n' && *b != b'\r')
            .collect();
        line.push(FRAME_DELIMITER);
        Ok(line)
    }

    /// Encodes a frame as indented JSON for the console mirror.
    ///
    /// # Errors
    ///
    /// Returns [`Encode`](crate::error::BridgeError::Encode) if JSON
    /// serialization fails.
    pub fn encode_pretty(&self, frame: &ControlFrame) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.wire(frame))?)
    }

    /// Human-readable labeled block with the axis each channel comes from.
    pub fn status_block(&self, frame: &ControlFrame, mapping: &AxisMapping) -> String {
        let p = self.precision as usize;
        format!(
            "LEFT STICK:\n  Yaw (axis {}): {:.p$}\n  Throttle (axis {}): mapped=[0..1] = {:.p$}\n\n\
             RIGHT STICK:\n  Pitch (axis {}): {:.p$}\n  Roll (axis {}): {:.p$}\n",
            mapping.yaw,
            round_to(frame.yaw, self.precision),
            mapping.throttle,
            round_to(frame.throttle, self.precision),
            mapping.pitch,
            round_to(frame.pitch, self.precision),
            mapping.roll,
            round_to(frame.roll, self.precision),
        )
    }
}
