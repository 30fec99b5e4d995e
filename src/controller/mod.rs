//! # Controller Module
//!
//! RC transmitter input handling.
//!
//! This module handles:
//! - Transmitter detection by name heuristics
//! - Opening and closing the device across hot-plug events
//! - Reading and normalizing analog stick axes
//! - Diagnostics over all input nodes

pub mod backend;
pub mod diagnose;
pub mod evdev_backend;
pub mod lifecycle;
pub mod matcher;
pub mod normalize;
