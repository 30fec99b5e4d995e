//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and every field is optional; a missing value falls back to
//! the built-in default, so running without a config file is the same as
//! loading `config/default.toml`.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Device selection configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    /// Case-insensitive substring searched for in advertised device names
    #[serde(default = "default_target_name")]
    pub target_name: String,

    /// Additional vendor aliases tried after the target name
    #[serde(default = "default_aliases")]
    pub aliases: Vec<String>,
}

/// Network stream configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    #[serde(default = "default_stream_enabled")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
}

/// Loop timing configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_idle_interval_ms")]
    pub idle_interval_ms: u64,

    /// Discovery is retried every this many idle iterations
    #[serde(default = "default_idle_retry_cycles")]
    pub idle_retry_cycles: u32,
}

/// Axis-to-channel mapping of the transmitter
#[derive(Debug, Deserialize, Clone)]
pub struct MappingConfig {
    #[serde(default = "default_yaw_axis")]
    pub yaw_axis: usize,

    #[serde(default = "default_throttle_axis")]
    pub throttle_axis: usize,

    #[serde(default = "default_pitch_axis")]
    pub pitch_axis: usize,

    #[serde(default = "default_roll_axis")]
    pub roll_axis: usize,
}

/// Console and payload formatting configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    /// Decimal places kept for channel values
    #[serde(default = "default_precision")]
    pub precision: u32,

    #[serde(default = "default_clear_screen")]
    pub clear_screen: bool,
}

// Default value functions
fn default_target_name() -> String { "radiomaster pocket joystick".to_string() }
fn default_aliases() -> Vec<String> { vec!["radiomaster".to_string(), "edgetx".to_string()] }

fn default_stream_enabled() -> bool { true }
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 9000 }
fn default_connect_timeout_ms() -> u64 { 2000 }
fn default_send_timeout_ms() -> u64 { 250 }

fn default_publish_interval_ms() -> u64 { 100 }
fn default_tick_interval_ms() -> u64 { 50 }
fn default_idle_interval_ms() -> u64 { 200 }
fn default_idle_retry_cycles() -> u32 { 10 }

fn default_yaw_axis() -> usize { 3 }
fn default_throttle_axis() -> usize { 2 }
fn default_pitch_axis() -> usize { 1 }
fn default_roll_axis() -> usize { 0 }

fn default_precision() -> u32 { 3 }
fn default_clear_screen() -> bool { true }

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            target_name: default_target_name(),
            aliases: default_aliases(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            enabled: default_stream_enabled(),
            host: default_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            send_timeout_ms: default_send_timeout_ms(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            publish_interval_ms: default_publish_interval_ms(),
            tick_interval_ms: default_tick_interval_ms(),
            idle_interval_ms: default_idle_interval_ms(),
            idle_retry_cycles: default_idle_retry_cycles(),
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            yaw_axis: default_yaw_axis(),
            throttle_axis: default_throttle_axis(),
            pitch_axis: default_pitch_axis(),
            roll_axis: default_roll_axis(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            precision: default_precision(),
            clear_screen: default_clear_screen(),
        }
    }
}

impl StreamConfig {
    /// Connect timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Send timeout as a [`Duration`]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rc_joystick_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.device.target_name.trim().is_empty() {
            return Err(invalid("device target_name cannot be empty"));
        }

        if self.device.aliases.iter().any(|alias| alias.trim().is_empty()) {
            return Err(invalid("device aliases cannot contain empty strings"));
        }

        if self.stream.enabled && self.stream.host.is_empty() {
            return Err(invalid("stream host cannot be empty when enabled"));
        }

        if self.stream.enabled && self.stream.port == 0 {
            return Err(invalid("stream port must be between 1 and 65535"));
        }

        if self.stream.connect_timeout_ms == 0 || self.stream.connect_timeout_ms > 60000 {
            return Err(invalid("connect_timeout_ms must be between 1 and 60000"));
        }

        if self.stream.send_timeout_ms == 0 || self.stream.send_timeout_ms > 10000 {
            return Err(invalid("send_timeout_ms must be between 1 and 10000"));
        }

        // Validate timing fields
        for (name, value) in [
            ("publish_interval_ms", self.timing.publish_interval_ms),
            ("tick_interval_ms", self.timing.tick_interval_ms),
            ("idle_interval_ms", self.timing.idle_interval_ms),
        ] {
            if value == 0 || value > 10000 {
                return Err(invalid(format!("{} must be between 1 and 10000", name)));
            }
        }

        if self.timing.tick_interval_ms > self.timing.publish_interval_ms {
            return Err(invalid("tick_interval_ms must not exceed publish_interval_ms"));
        }

        if self.timing.idle_retry_cycles == 0 {
            return Err(invalid("idle_retry_cycles must be greater than 0"));
        }

        // Validate axis indices (evdev exposes at most 64 absolute axes)
        for (name, value) in [
            ("yaw_axis", self.mapping.yaw_axis),
            ("throttle_axis", self.mapping.throttle_axis),
            ("pitch_axis", self.mapping.pitch_axis),
            ("roll_axis", self.mapping.roll_axis),
        ] {
            if value > 63 {
                return Err(invalid(format!("{} must be between 0 and 63", name)));
            }
        }

        if self.display.precision > 6 {
            return Err(invalid("precision must be between 0 and 6"));
        }

        Ok(())
    }
}

fn invalid(message: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(message))
}
