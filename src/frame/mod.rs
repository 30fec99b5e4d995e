//! # Frame Module
//!
//! Control frames built from transmitter samples and their encodings.
//!
//! This module handles:
//! - Mapping physical axes to yaw/throttle/pitch/roll
//! - Building one immutable frame per publish tick
//! - Newline-delimited JSON encoding for the stream
//! - Pretty JSON and the labeled status block for the console

pub mod control;
pub mod encoder;

pub use control::{AxisMapping, ControlFrame};
pub use encoder::FrameEncoder;
