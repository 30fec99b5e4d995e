//! # Axis Normalizer
//!
//! Converts raw signed 16-bit axis samples into control values.
//!
//! ## Ranges
//!
//! | Function | Input | Output |
//! |----------|-------|--------|
//! | [`normalize`] | -32768..=32767 | -1.0..=1.0 |
//! | [`throttle_remap`] | -32768..=32767 | 0.0..=1.0 |
//!
//! The positive half divides by 32767 and the negative half by 32768, so both
//! stick extremes land exactly on ±1.0.
//!
//! ## Usage
//!
//! ```
//! use rc_joystick_bridge::controller::normalize::{normalize, throttle_remap};
//!
//! assert_eq!(normalize(i16::MAX), 1.0);
//! assert_eq!(normalize(i16::MIN), -1.0);
//! assert_eq!(throttle_remap(i16::MIN), 0.0);
//! ```

/// Divisor for non-negative samples.
pub const POSITIVE_SPAN: f64 = 32767.0;

/// Divisor for negative samples.
pub const NEGATIVE_SPAN: f64 = 32768.0;

/// Value used when an axis is not present on the device.
pub const NEUTRAL: f64 = 0.0;

/// Maps a raw sample to `[-1.0, 1.0]`.
#[must_use]
pub fn normalize(raw: i16) -> f64 {
    if raw >= 0 {
        f64::from(raw) / POSITIVE_SPAN
    } else {
        f64::from(raw) / NEGATIVE_SPAN
    }
}

/// Maps a raw sample to `[0.0, 1.0]` for a throttle channel.
///
/// The bipolar value from [`normalize`] is shifted with `(n + 1) / 2` and
/// clamped.
#[must_use]
pub fn throttle_remap(raw: i16) -> f64 {
    remap_unipolar(normalize(raw))
}

/// Shifts a bipolar value in `[-1, 1]` into `[0, 1]`.
#[inline]
#[must_use]
pub fn remap_unipolar(value: f64) -> f64 {
    ((value + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Axis values captured from a device at a single instant.
///
/// One entry per physical axis in device order. Indices past the end read as
/// [`NEUTRAL`], which covers a device swap that changed the axis count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AxisSample {
    values: Vec<i16>,
}

impl AxisSample {
    /// Creates a sample from raw axis values.
    #[must_use]
    pub fn new(values: Vec<i16>) -> Self {
        Self { values }
    }

    /// Number of axes in the sample.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the device reported no axes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value of an axis, if the device has it.
    #[must_use]
    pub fn raw(&self, axis: usize) -> Option<i16> {
        self.values.get(axis).copied()
    }

    /// Normalized value of an axis, neutral when the axis is missing.
    #[must_use]
    pub fn normalized(&self, axis: usize) -> f64 {
        self.raw(axis).map_or(NEUTRAL, normalize)
    }

    /// Throttle-remapped value of an axis.
    ///
    /// A missing axis remaps the neutral value, i.e. half throttle.
    #[must_use]
    pub fn throttle(&self, axis: usize) -> f64 {
        remap_unipolar(self.normalized(axis))
    }

    /// Raw values in device order.
    pub fn values(&self) -> &[i16] {
        &self.values
    }
}
