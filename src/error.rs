//! # Error Types
//!
//! Custom error types for RC Joystick Bridge using `thiserror`.

use thiserror::Error;

/// Main error type for RC Joystick Bridge
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame serialization errors
    #[error("Frame encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The input subsystem could not be started
    #[error("Input subsystem initialization failed: {0}")]
    InputInit(String),

    /// A matched device could not be opened
    #[error("Failed to open device '{name}' at index {index}: {reason}")]
    DeviceOpen {
        index: usize,
        name: String,
        reason: String,
    },

    /// Reading the axis state of an open device failed
    #[error("Failed to read axes: {0}")]
    DeviceRead(String),

    /// The stream peer refused or could not be reached
    #[error("Failed to connect to {peer}: {reason}")]
    Connect { peer: String, reason: String },

    /// Connecting took longer than the configured timeout
    #[error("Connection to {0} timed out")]
    ConnectTimeout(String),

    /// Writing a frame to the stream failed
    #[error("Stream send failed: {0}")]
    Send(String),

    /// Writing a frame did not complete within the send timeout
    #[error("Stream send timed out after {0} ms")]
    SendTimeout(u64),
}

/// Result type alias for RC Joystick Bridge
pub type Result<T> = std::result::Result<T, BridgeError>;
