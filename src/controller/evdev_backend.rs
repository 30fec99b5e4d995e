//! # Evdev Input Backend
//!
//! Linux implementation of [`InputBackend`] on top of `/dev/input/event*`.
//!
//! ## Hot-plug
//!
//! evdev has no event stream for device arrival, so every poll rescans the
//! input directory and diffs the set of event nodes against the previous
//! scan. A node that appears gets a fresh instance id and produces
//! `DeviceAdded`; a node that disappears produces `DeviceRemoved` with the id
//! it was given. Ids are never reused within a run, so a replugged device that
//! lands on the same node path is still a new instance.
//!
//! ## Joystick detection
//!
//! A node is enumerated as a joystick when it reports absolute axes and at
//! least one button in the joystick/gamepad ranges (`BTN_JOYSTICK`..`BTN_DIGI`
//! or `BTN_TRIGGER_HAPPY*`). EdgeTX radios in joystick mode expose both.
//!
//! ## Axis order
//!
//! Axes are reported in ascending `ABS_*` code order with the hat axes
//! (`ABS_HAT0X`..`ABS_HAT3Y`) left out, and each value is rescaled from the
//! driver's `[minimum, maximum]` into `-32768..=32767`.

use evdev::{AbsoluteAxisType, Device};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::backend::{DeviceInfo, InputBackend, InputDevice, SystemEvent, UNKNOWN_DEVICE_NAME};
use super::diagnose::ScannedNode;
use super::normalize::AxisSample;
use crate::error::{BridgeError, Result};

/// Directory scanned for event nodes.
pub const INPUT_DIR: &str = "/dev/input";

/// First joystick button code (`BTN_JOYSTICK`).
const BTN_JOYSTICK: u16 = 0x120;
/// First digitizer button code (`BTN_DIGI`), end of the joystick/gamepad range.
const BTN_DIGI: u16 = 0x140;
/// Extra buttons used by devices with many switches (`BTN_TRIGGER_HAPPY1`..`40`).
const BTN_TRIGGER_HAPPY_FIRST: u16 = 0x2c0;
const BTN_TRIGGER_HAPPY_LAST: u16 = 0x2e7;

/// Hat axis codes (`ABS_HAT0X`..=`ABS_HAT3Y`), not reported as axes.
const ABS_HAT_FIRST: u16 = 0x10;
const ABS_HAT_LAST: u16 = 0x17;

/// Evdev-based input backend.
pub struct EvdevBackend {
    input_dir: PathBuf,
    /// Event nodes seen in the last scan, with their instance ids.
    known: BTreeMap<PathBuf, u32>,
    next_instance_id: u32,
    pending: Vec<SystemEvent>,
}

impl std::fmt::Debug for EvdevBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvdevBackend")
            .field("input_dir", &self.input_dir)
            .field("known_nodes", &self.known.len())
            .finish_non_exhaustive()
    }
}

impl EvdevBackend {
    /// Starts the backend on `/dev/input`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::InputInit`] if the input directory is missing or
    /// cannot be listed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc_joystick_bridge::controller::evdev_backend::EvdevBackend;
    ///
    /// let backend = EvdevBackend::new()?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new() -> Result<Self> {
        Self::with_input_dir(INPUT_DIR)
    }

    /// Starts the backend on a custom input directory.
    ///
    /// Nodes present at startup are registered silently; only later changes
    /// produce hot-plug events.
    pub fn with_input_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let input_dir = dir.as_ref().to_path_buf();
        if !input_dir.is_dir() {
            return Err(BridgeError::InputInit(format!(
                "{} directory not found",
                input_dir.display()
            )));
        }

        let nodes = event_nodes(&input_dir).map_err(|e| {
            BridgeError::InputInit(format!("Failed to read {}: {}", input_dir.display(), e))
        })?;

        let mut backend = Self {
            input_dir,
            known: BTreeMap::new(),
            next_instance_id: 0,
            pending: Vec::new(),
        };
        for node in nodes {
            let id = backend.allocate_instance_id();
            backend.known.insert(node, id);
        }
        info!(
            "Input backend ready on {} ({} event nodes)",
            backend.input_dir.display(),
            backend.known.len()
        );
        Ok(backend)
    }

    /// Input directory this backend scans.
    pub fn input_dir(&self) -> &Path {
        &self.input_dir
    }

    fn allocate_instance_id(&mut self) -> u32 {
        let id = self.next_instance_id;
        self.next_instance_id = self.next_instance_id.wrapping_add(1);
        id
    }

    /// Rescans the input directory and queues events for any differences.
    fn sync(&mut self) {
        let current: BTreeSet<PathBuf> = match event_nodes(&self.input_dir) {
            Ok(nodes) => nodes.into_iter().collect(),
            Err(e) => {
                debug!("Failed to rescan {}: {}", self.input_dir.display(), e);
                return;
            }
        };

        let removed: Vec<PathBuf> = self
            .known
            .keys()
            .filter(|path| !current.contains(*path))
            .cloned()
            .collect();
        for path in removed {
            if let Some(instance_id) = self.known.remove(&path) {
                debug!("Event node {} disappeared (instance {})", path.display(), instance_id);
                self.pending.push(SystemEvent::DeviceRemoved { instance_id });
            }
        }

        for path in current {
            if !self.known.contains_key(&path) {
                let instance_id = self.allocate_instance_id();
                debug!("Event node {} appeared (instance {})", path.display(), instance_id);
                self.known.insert(path, instance_id);
                self.pending.push(SystemEvent::DeviceAdded { instance_id });
            }
        }
    }

    /// Describes every event node, joystick or not, for diagnostics.
    pub fn scan_all(&self) -> Vec<ScannedNode> {
        let nodes = match event_nodes(&self.input_dir) {
            Ok(nodes) => nodes,
            Err(e) => {
                debug!("Failed to scan {}: {}", self.input_dir.display(), e);
                return Vec::new();
            }
        };

        nodes
            .into_iter()
            .map(|path| {
                let path_str = path.to_string_lossy().to_string();
                match Device::open(&path) {
                    Ok(device) => describe_node(path_str, &device),
                    Err(e) => ScannedNode::unreadable(path_str, e.to_string()),
                }
            })
            .collect()
    }
}

impl InputBackend for EvdevBackend {
    fn poll_events(&mut self) -> Vec<SystemEvent> {
        self.sync();
        std::mem::take(&mut self.pending)
    }

    fn enumerate(&mut self) -> Vec<DeviceInfo> {
        self.sync();

        let mut devices = Vec::new();
        for (path, &instance_id) in &self.known {
            match Device::open(path) {
                Ok(device) => {
                    let id = device.input_id();
                    debug!(
                        "Found input device: {} (vendor: 0x{:04x}, product: 0x{:04x})",
                        path.display(),
                        id.vendor(),
                        id.product()
                    );
                    if !is_joystick_like(&device) {
                        continue;
                    }
                    devices.push(DeviceInfo {
                        index: devices.len(),
                        instance_id,
                        name: device.name().unwrap_or(UNKNOWN_DEVICE_NAME).to_string(),
                        path: path.to_string_lossy().to_string(),
                    });
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }
        devices
    }

    fn open(&mut self, info: &DeviceInfo) -> Result<Box<dyn InputDevice>> {
        let device = Device::open(&info.path).map_err(|e| BridgeError::DeviceOpen {
            index: info.index,
            name: info.name.clone(),
            reason: e.to_string(),
        })?;
        Ok(Box::new(EvdevJoystick::new(device, info.instance_id)))
    }
}

/// An open evdev joystick.
pub struct EvdevJoystick {
    device: Device,
    instance_id: u32,
    name: String,
    guid: String,
    axes: Vec<AbsoluteAxisType>,
}

impl EvdevJoystick {
    fn new(device: Device, instance_id: u32) -> Self {
        let name = device.name().unwrap_or(UNKNOWN_DEVICE_NAME).to_string();
        let id = device.input_id();
        let guid = sdl_guid_string(id.bus_type().0, id.vendor(), id.product(), id.version(), &name);
        let axes = reported_axes(&device);
        Self {
            device,
            instance_id,
            name,
            guid,
            axes,
        }
    }

    /// Number of axes reported by [`read_axes`](InputDevice::read_axes).
    pub fn axis_count(&self) -> usize {
        self.axes.len()
    }
}

impl InputDevice for EvdevJoystick {
    fn instance_id(&self) -> u32 {
        self.instance_id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn guid(&self) -> String {
        self.guid.clone()
    }

    fn read_axes(&mut self) -> Result<AxisSample> {
        let state = self
            .device
            .get_abs_state()
            .map_err(|e| BridgeError::DeviceRead(format!("{}: {}", self.name, e)))?;

        let values = self
            .axes
            .iter()
            .map(|axis| {
                let info = &state[axis.0 as usize];
                scale_to_i16(info.value, info.minimum, info.maximum)
            })
            .collect();
        Ok(AxisSample::new(values))
    }
}

/// Sorted `event*` nodes in a directory.
fn event_nodes(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut nodes = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_event = path
            .file_name()
            .map(|name| name.to_string_lossy().starts_with("event"))
            .unwrap_or(false);
        if is_event {
            nodes.push(path);
        }
    }
    // Sort entries for deterministic enumeration order
    nodes.sort();
    Ok(nodes)
}

fn is_joystick_button(code: u16) -> bool {
    (BTN_JOYSTICK..BTN_DIGI).contains(&code)
        || (BTN_TRIGGER_HAPPY_FIRST..=BTN_TRIGGER_HAPPY_LAST).contains(&code)
}

fn is_hat_axis(code: u16) -> bool {
    (ABS_HAT_FIRST..=ABS_HAT_LAST).contains(&code)
}

fn is_joystick_like(device: &Device) -> bool {
    let has_axes = !reported_axes(device).is_empty();
    let has_buttons = device
        .supported_keys()
        .map(|keys| keys.iter().any(|key| is_joystick_button(key.code())))
        .unwrap_or(false);
    has_axes && has_buttons
}

fn reported_axes(device: &Device) -> Vec<AbsoluteAxisType> {
    device
        .supported_absolute_axes()
        .map(|axes| axes.iter().filter(|axis| !is_hat_axis(axis.0)).collect())
        .unwrap_or_default()
}

fn describe_node(path: String, device: &Device) -> ScannedNode {
    let id = device.input_id();
    ScannedNode {
        path,
        name: device.name().unwrap_or_default().to_string(),
        phys: device.physical_path().unwrap_or_default().to_string(),
        bus: id.bus_type().0,
        vendor: id.vendor(),
        product: id.product(),
        axis_count: reported_axes(device).len(),
        joystick_like: is_joystick_like(device),
        error: None,
    }
}

/// Rescales a driver axis value from `[min, max]` into the signed 16-bit range.
///
/// A degenerate range (`max <= min`) reads as centered.
#[must_use]
pub fn scale_to_i16(value: i32, min: i32, max: i32) -> i16 {
    if max <= min {
        return 0;
    }
    let span = f64::from(max) - f64::from(min);
    let position = (f64::from(value.clamp(min, max)) - f64::from(min)) / span;
    (position * 65535.0 - 32768.0)
        .round()
        .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}

/// Builds the SDL-style joystick GUID string for a Linux input device.
///
/// Layout (16 bytes, little-endian 16-bit fields, hex encoded):
/// bus, 0, vendor, 0, product, 0, version, 0. Devices without vendor and
/// product ids carry the first 12 bytes of their name after the bus instead.
#[must_use]
pub fn sdl_guid_string(bus: u16, vendor: u16, product: u16, version: u16, name: &str) -> String {
    let mut bytes = [0u8; 16];
    bytes[0..2].copy_from_slice(&bus.to_le_bytes());

    if vendor != 0 && product != 0 {
        bytes[4..6].copy_from_slice(&vendor.to_le_bytes());
        bytes[8..10].copy_from_slice(&product.to_le_bytes());
        bytes[12..14].copy_from_slice(&version.to_le_bytes());
    } else {
        let name_bytes = name.as_bytes();
        let len = name_bytes.len().min(12);
        bytes[4..4 + len].copy_from_slice(&name_bytes[..len]);
    }

    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
