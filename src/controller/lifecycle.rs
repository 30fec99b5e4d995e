//! # Device Lifecycle Manager
//!
//! Owns at most one open transmitter handle and moves it between states.
//!
//! ```text
//!              discover() finds a match
//!   NoDevice ──────────────────────────────► Open
//!      ▲                                      │  discover() → same index: no-op
//!      │   removal of the open instance id    │  discover() → other index: close, reopen
//!      └──────────────────────────────────────┘
//! ```
//!
//! The descriptor and the handle live in the same `Option`, so closing the
//! handle always clears the identity with it.

use std::fmt;
use tracing::{debug, error, info};

use super::backend::{DeviceInfo, InputBackend, InputDevice};
use super::matcher::DeviceMatcher;

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    NoDevice,
    Open,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceState::NoDevice => write!(f, "NoDevice"),
            DeviceState::Open => write!(f, "Open"),
        }
    }
}

/// Identity of the open device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub index: usize,
    pub instance_id: u32,
    pub display_name: String,
    pub guid: String,
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "index={} instance_id={} name='{}' guid={}",
            self.index, self.instance_id, self.display_name, self.guid
        )
    }
}

/// Result of a discovery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// No visible device matched.
    NotFound,
    /// The match is the device that is already open.
    AlreadyOpen,
    /// A device was opened (possibly replacing another one).
    Opened(DeviceDescriptor),
    /// The matched device could not be opened.
    OpenFailed,
}

struct OpenDevice {
    descriptor: DeviceDescriptor,
    handle: Box<dyn InputDevice>,
}

/// Device lifecycle state machine.
pub struct DeviceLifecycle {
    matcher: DeviceMatcher,
    current: Option<OpenDevice>,
}

impl fmt::Debug for DeviceLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceLifecycle")
            .field("matcher", &self.matcher)
            .field("current", &self.descriptor())
            .finish()
    }
}

impl DeviceLifecycle {
    /// Creates a manager in the `NoDevice` state.
    #[must_use]
    pub fn new(matcher: DeviceMatcher) -> Self {
        Self {
            matcher,
            current: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> DeviceState {
        if self.current.is_some() {
            DeviceState::Open
        } else {
            DeviceState::NoDevice
        }
    }

    /// Identity of the open device, if any.
    pub fn descriptor(&self) -> Option<&DeviceDescriptor> {
        self.current.as_ref().map(|open| &open.descriptor)
    }

    /// Open device handle together with its identity.
    pub fn device_mut(&mut self) -> Option<(&DeviceDescriptor, &mut dyn InputDevice)> {
        let open = self.current.as_mut()?;
        let handle: &mut dyn InputDevice = open.handle.as_mut();
        Some((&open.descriptor, handle))
    }

    /// Runs the matcher over the current enumeration and opens the result.
    ///
    /// A match on the already open index keeps the handle untouched. A match
    /// on another index closes the old handle before opening the new one. No
    /// match leaves the current state as it is.
    pub fn discover(&mut self, backend: &mut dyn InputBackend) -> Discovery {
        let devices = backend.enumerate();
        let Some(index) = self.matcher.find_candidate(&devices) else {
            debug!("No matching transmitter in current device list ({} devices)", devices.len());
            return Discovery::NotFound;
        };
        let Some(info) = devices.iter().find(|device| device.index == index) else {
            return Discovery::NotFound;
        };
        info!("Found candidate joystick index={} name='{}'", info.index, info.name);

        if self.descriptor().map(|current| current.index) == Some(index) {
            debug!("Candidate at index {} is already open", index);
            return Discovery::AlreadyOpen;
        }

        if let Some(previous) = self.current.take() {
            info!(
                "Closing previously opened joystick (index {}) to switch devices",
                previous.descriptor.index
            );
            drop(previous);
        }

        self.open(backend, info)
    }

    fn open(&mut self, backend: &mut dyn InputBackend, info: &DeviceInfo) -> Discovery {
        info!("Attempting to open transmitter at device index {}", info.index);
        let handle = match backend.open(info) {
            Ok(handle) => handle,
            Err(e) => {
                error!("{}", e);
                return Discovery::OpenFailed;
            }
        };

        let descriptor = DeviceDescriptor {
            index: info.index,
            instance_id: handle.instance_id(),
            display_name: handle.name().to_string(),
            guid: handle.guid(),
        };
        info!("Opened joystick {}", descriptor);

        self.current = Some(OpenDevice {
            descriptor: descriptor.clone(),
            handle,
        });
        Discovery::Opened(descriptor)
    }

    /// Handles a removal event.
    ///
    /// Returns true if the open device was the one removed and has been
    /// closed. Removals of other instances are ignored.
    pub fn handle_removed(&mut self, instance_id: u32) -> bool {
        match &self.current {
            Some(open) if open.descriptor.instance_id == instance_id => {
                info!(
                    "Open transmitter was removed, closing joystick {}",
                    open.descriptor
                );
                self.current = None;
                true
            }
            Some(open) => {
                debug!(
                    "Ignoring removal of instance {} (open instance is {})",
                    instance_id, open.descriptor.instance_id
                );
                false
            }
            None => false,
        }
    }

    /// Closes the open device, if any.
    pub fn close(&mut self) {
        if let Some(open) = self.current.take() {
            info!("Closing joystick {}", open.descriptor);
        }
    }
}
