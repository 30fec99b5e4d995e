//! # RC Joystick Bridge Library
//!
//! Stream the sticks of an RC transmitter in USB joystick mode over TCP.
//!
//! This library provides the core functionality for detecting a
//! RadioMaster/EdgeTX transmitter, following it across hot-plug events,
//! normalizing its axes and publishing newline-delimited JSON control frames.

pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod session;
pub mod stream;
