//! # Control Frame Types
//!
//! Axis mapping of the transmitter and the per-tick control frame.

use chrono::{DateTime, FixedOffset};

use crate::config::MappingConfig;
use crate::controller::lifecycle::DeviceDescriptor;
use crate::controller::normalize::AxisSample;

/// Which physical axis drives which control channel.
///
/// The default matches a RadioMaster Pocket in EdgeTX joystick mode (mode 2):
///
/// | Channel | Stick | Axis |
/// |---------|-------|------|
/// | Yaw | left X | 3 |
/// | Throttle | left Y | 2 (remapped to 0..1) |
/// | Roll | right X | 0 |
/// | Pitch | right Y | 1 |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMapping {
    pub yaw: usize,
    pub throttle: usize,
    pub pitch: usize,
    pub roll: usize,
}

impl Default for AxisMapping {
    fn default() -> Self {
        Self {
            yaw: 3,
            throttle: 2,
            pitch: 1,
            roll: 0,
        }
    }
}

impl From<&MappingConfig> for AxisMapping {
    fn from(config: &MappingConfig) -> Self {
        Self {
            yaw: config.yaw_axis,
            throttle: config.throttle_axis,
            pitch: config.pitch_axis,
            roll: config.roll_axis,
        }
    }
}

/// Normalized control values of a single sampling instant.
///
/// `yaw`, `pitch` and `roll` are in `[-1, 1]`; `throttle` is in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlFrame {
    pub device_name: String,
    pub device_index: usize,
    pub guid: String,
    pub timestamp: DateTime<FixedOffset>,
    pub yaw: f64,
    pub throttle: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl ControlFrame {
    /// Builds a frame from a raw sample.
    ///
    /// Axes the device does not have read as neutral.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{FixedOffset, TimeZone};
    /// use rc_joystick_bridge::controller::lifecycle::DeviceDescriptor;
    /// use rc_joystick_bridge::controller::normalize::AxisSample;
    /// use rc_joystick_bridge::frame::{AxisMapping, ControlFrame};
    ///
    /// let device = DeviceDescriptor {
    ///     index: 0,
    ///     instance_id: 1,
    ///     display_name: "RadioMaster Pocket Joystick".into(),
    ///     guid: "03000000091200004f54000011010000".into(),
    /// };
    /// let timestamp = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    /// let sample = AxisSample::new(vec![0, 0, i16::MAX, i16::MIN]);
    ///
    /// let frame = ControlFrame::from_sample(&sample, &AxisMapping::default(), &device, timestamp);
    /// assert_eq!(frame.yaw, -1.0);
    /// assert_eq!(frame.throttle, 1.0);
    /// ```
    #[must_use]
    pub fn from_sample(
        sample: &AxisSample,
        mapping: &AxisMapping,
        device: &DeviceDescriptor,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            device_name: device.display_name.clone(),
            device_index: device.index,
            guid: device.guid.clone(),
            timestamp,
            yaw: sample.normalized(mapping.yaw),
            throttle: sample.throttle(mapping.throttle),
            pitch: sample.normalized(mapping.pitch),
            roll: sample.normalized(mapping.roll),
        }
    }
}
