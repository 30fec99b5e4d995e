//! Command-line interface definitions

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "rc-joystick-bridge")]
#[command(author, version, about = "Stream RC transmitter sticks as JSON lines over TCP")]
#[command(long_about = "
Finds a RadioMaster/EdgeTX transmitter connected in USB joystick mode, samples
its sticks and publishes yaw, throttle, pitch and roll as one JSON object per
line to a TCP peer. Every published frame is mirrored to the terminal.

The transmitter may be plugged in or removed at any time.

SETUP:
  1. Add yourself to the input group: sudo usermod -aG input $USER
  2. Log out and back in
  3. Put the transmitter in USB joystick (HID) mode
  4. Run: rc-joystick-bridge --list-devices (to check it is visible)
")]
pub struct Cli {
    /// Device name to look for (case-insensitive substring)
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Override stream peer host
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Override stream peer port
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// List every input device with diagnostics and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Log level selected by the verbosity count
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Applies command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(name) = &self.name {
            config.device.target_name = name.clone();
        }
        if let Some(host) = &self.host {
            config.stream.host = host.clone();
        }
        if let Some(port) = self.port {
            config.stream.port = port;
        }
    }
}
