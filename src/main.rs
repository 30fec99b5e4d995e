//! # RC Joystick Bridge
//!
//! Stream the sticks of a RadioMaster/EdgeTX transmitter in USB joystick mode
//! to a TCP peer as newline-delimited JSON.

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rc_joystick_bridge::cli::Cli;
use rc_joystick_bridge::config::Config;
use rc_joystick_bridge::controller::diagnose::{keyword_matcher, DiagnosticReport};
use rc_joystick_bridge::controller::evdev_backend::EvdevBackend;
use rc_joystick_bridge::session::{Session, TerminalDisplay};
use rc_joystick_bridge::stream::StreamTransport;

/// Main entry point for RC Joystick Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Parse the command line and set up logging on stderr
///    - Load the configuration and apply command-line overrides
///    - Start the input backend (fatal on failure)
///    - Connect to the stream peer (non-fatal on failure)
///
/// 2. **Main Loop**
///    - Keep the transmitter open across hot-plug events
///    - Publish one frame every 100 ms while a device is open
///    - Stop on Ctrl+C or SIGTERM
///
/// 3. **Graceful Shutdown**
///    - Close the device and the connection
///    - Log the session totals
///
/// # Errors
///
/// Returns error (exit code 1) if:
/// - The configuration cannot be loaded or is invalid
/// - The input subsystem cannot be initialized
///
/// # Examples
///
/// ```bash
/// rc-joystick-bridge --host 127.0.0.1 --port 9000
/// ```
///
/// Expected output on stderr:
/// ```text
/// INFO rc_joystick_bridge: RC Joystick Bridge v0.1.0 starting...
/// INFO rc_joystick_bridge::stream: Connected to 127.0.0.1:9000
/// INFO rc_joystick_bridge::controller::lifecycle: Opened joystick index=0 instance_id=1 name='RadioMaster Pocket Joystick' guid=...
/// INFO rc_joystick_bridge::session: Published 100 frames (100 sent, stream connected)
/// ```
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they do not interleave with the console mirror
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("rc_joystick_bridge={},warn", cli.log_level()))),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("RC Joystick Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    cli.apply_overrides(&mut config);
    config.validate().context("Invalid configuration")?;

    let backend = EvdevBackend::new().context("Failed to initialize input subsystem")?;

    if cli.list_devices {
        let report = DiagnosticReport::build(backend.scan_all(), &keyword_matcher());
        print!("{}", report);
        return Ok(());
    }

    let transport = if config.stream.enabled {
        match StreamTransport::connect(
            &config.stream.host,
            config.stream.port,
            config.stream.connect_timeout(),
            config.stream.send_timeout(),
        )
        .await
        {
            Ok(transport) => transport,
            Err(e) => {
                warn!("{}; continuing with console output only", e);
                StreamTransport::disabled()
            }
        }
    } else {
        info!("Stream disabled in configuration, console output only");
        StreamTransport::disabled()
    };

    let shutdown = CancellationToken::new();
    tokio::spawn(listen_for_shutdown(shutdown.clone()));
    info!("Press Ctrl+C to exit");

    let session = Session::new(
        &config,
        Box::new(backend),
        transport,
        Box::new(TerminalDisplay::new(config.display.clear_screen)),
        shutdown,
    );
    let stats = session.run().await;

    info!(
        "Shutdown complete ({} frames published, {} sent)",
        stats.frames_published, stats.frames_sent
    );
    Ok(())
}

/// Cancels `shutdown` on Ctrl+C or SIGTERM
async fn listen_for_shutdown(shutdown: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received Ctrl+C, shutting down...");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    shutdown.cancel();
}
