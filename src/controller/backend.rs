//! # Input Backend Abstraction
//!
//! Trait seam between the device lifecycle and the platform input layer.
//!
//! The core never touches device nodes directly. It drains hot-plug events,
//! enumerates joystick-like devices and opens one through [`InputBackend`],
//! then samples axes through the returned [`InputDevice`]. Dropping the
//! device handle releases it.

use std::fmt;

use super::normalize::AxisSample;
use crate::error::Result;

/// Name reported when a device does not advertise one.
pub const UNKNOWN_DEVICE_NAME: &str = "(unknown)";

/// A device visible in the current enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Enumeration-order slot. May be reused by another physical device.
    pub index: usize,
    /// Identity of this connection session of the device.
    pub instance_id: u32,
    /// Advertised device name.
    pub name: String,
    /// Backend-specific node key (e.g. `/dev/input/event7`).
    pub path: String,
}

/// Out-of-band notifications drained from the backend each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    /// A device appeared.
    DeviceAdded { instance_id: u32 },
    /// A device disappeared.
    DeviceRemoved { instance_id: u32 },
    /// The process was asked to terminate.
    Quit,
}

impl fmt::Display for SystemEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemEvent::DeviceAdded { instance_id } => {
                write!(f, "DEVICE_ADDED instance_id={}", instance_id)
            }
            SystemEvent::DeviceRemoved { instance_id } => {
                write!(f, "DEVICE_REMOVED instance_id={}", instance_id)
            }
            SystemEvent::Quit => write!(f, "QUIT"),
        }
    }
}

/// Platform input layer.
#[cfg_attr(test, mockall::automock)]
pub trait InputBackend: Send {
    /// Returns every pending event without blocking.
    fn poll_events(&mut self) -> Vec<SystemEvent>;

    /// Lists joystick-like devices currently visible, in enumeration order.
    fn enumerate(&mut self) -> Vec<DeviceInfo>;

    /// Opens a device from the latest enumeration.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceOpen`](crate::error::BridgeError::DeviceOpen) if the
    /// node vanished or cannot be accessed.
    fn open(&mut self, info: &DeviceInfo) -> Result<Box<dyn InputDevice>>;
}

/// An open device handle.
pub trait InputDevice: Send {
    /// Instance id assigned when the device appeared.
    fn instance_id(&self) -> u32;

    /// Advertised device name.
    fn name(&self) -> &str;

    /// Platform GUID string, used for diagnostics.
    fn guid(&self) -> String;

    /// Reads the full current axis vector.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceRead`](crate::error::BridgeError::DeviceRead) when the
    /// device stopped answering, typically right before its removal event.
    fn read_axes(&mut self) -> Result<AxisSample>;
}
