//! # Sampling & Publish Session
//!
//! Single-threaded loop that keeps one transmitter open, samples its sticks
//! and publishes control frames.
//!
//! Each tick:
//! 1. Drain pending backend events. Additions trigger discovery while no
//!    device is open, removals go to the lifecycle manager, quit ends the loop.
//! 2. Without a device, count an idle iteration, retry discovery every
//!    `idle_retry_cycles` iterations and sleep the idle interval.
//! 3. With a device, publish when the publish interval has elapsed: read axes,
//!    build the frame, mirror it to the console and send it to the peer.
//! 4. Sleep the tick interval.

use chrono::Local;
use std::io::{self, Write};
use tokio::time::{sleep, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::{Config, TimingConfig};
use crate::controller::backend::{InputBackend, SystemEvent};
use crate::controller::lifecycle::{DeviceLifecycle, DeviceState, Discovery};
use crate::controller::matcher::DeviceMatcher;
use crate::frame::{AxisMapping, ControlFrame, FrameEncoder};
use crate::stream::{SendStatus, StreamTransport};

/// Minimum time between two published frames
pub const DEFAULT_PUBLISH_INTERVAL: Duration = Duration::from_millis(100);

/// Sleep after every tick with an open device
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Sleep after every tick without a device
pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(200);

/// Idle iterations between two discovery retries
pub const DEFAULT_IDLE_RETRY_CYCLES: u32 = 10;

/// Number of published frames between status log messages
pub const LOG_INTERVAL_FRAMES: u64 = 100;

/// ANSI clear screen and cursor home
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Loop durations and retry period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub publish_interval: Duration,
    pub tick_interval: Duration,
    pub idle_interval: Duration,
    pub idle_retry_cycles: u32,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            publish_interval: DEFAULT_PUBLISH_INTERVAL,
            tick_interval: DEFAULT_TICK_INTERVAL,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            idle_retry_cycles: DEFAULT_IDLE_RETRY_CYCLES,
        }
    }
}

impl From<&TimingConfig> for Timing {
    fn from(config: &TimingConfig) -> Self {
        Self {
            publish_interval: Duration::from_millis(config.publish_interval_ms),
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            idle_interval: Duration::from_millis(config.idle_interval_ms),
            idle_retry_cycles: config.idle_retry_cycles.max(1),
        }
    }
}

/// Console mirror of the session.
pub trait StatusDisplay {
    /// Shows a published frame: pretty payload, then the labeled block.
    fn frame(&mut self, pretty: &str, block: &str);

    /// Shows a device state change.
    fn state_changed(&mut self, state: DeviceState);
}

/// [`StatusDisplay`] writing to stdout.
#[derive(Debug, Clone)]
pub struct TerminalDisplay {
    clear_screen: bool,
}

impl TerminalDisplay {
    pub fn new(clear_screen: bool) -> Self {
        Self { clear_screen }
    }

    fn render_frame(&self, pretty: &str, block: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        if self.clear_screen {
            out.write_all(CLEAR_SCREEN.as_bytes())?;
        }
        writeln!(out, "{}\n\n{}", pretty, block)?;
        out.flush()
    }
}

impl StatusDisplay for TerminalDisplay {
    fn frame(&mut self, pretty: &str, block: &str) {
        if let Err(e) = self.render_frame(pretty, block) {
            debug!("Console write failed: {}", e);
        }
    }

    fn state_changed(&mut self, state: DeviceState) {
        println!("Device state: {}", state);
    }
}

/// Counters reported at shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_published: u64,
    pub frames_sent: u64,
    pub discovery_attempts: u64,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No device open; the idle interval follows.
    Idle,
    /// Device open but nothing published this tick.
    Waiting,
    /// A frame was published.
    Published,
    /// A quit was requested.
    Quit,
}

/// Owns the backend, device, transport and console for one run.
pub struct Session {
    backend: Box<dyn InputBackend>,
    lifecycle: DeviceLifecycle,
    transport: StreamTransport,
    display: Box<dyn StatusDisplay>,
    mapping: AxisMapping,
    encoder: FrameEncoder,
    timing: Timing,
    idle_cycles: u64,
    last_publish: Option<Instant>,
    /// Instance id last shown to the console, `None` while no device is open
    reported_instance: Option<u32>,
    stats: SessionStats,
    shutdown: CancellationToken,
}

impl Session {
    /// Creates a session from the loaded configuration.
    ///
    /// `shutdown` ends the loop when cancelled, in addition to quit events
    /// from the backend.
    pub fn new(
        config: &Config,
        backend: Box<dyn InputBackend>,
        transport: StreamTransport,
        display: Box<dyn StatusDisplay>,
        shutdown: CancellationToken,
    ) -> Self {
        let matcher = DeviceMatcher::new(&config.device.target_name, &config.device.aliases);
        Self {
            backend,
            lifecycle: DeviceLifecycle::new(matcher),
            transport,
            display,
            mapping: AxisMapping::from(&config.mapping),
            encoder: FrameEncoder::new(config.display.precision),
            timing: Timing::from(&config.timing),
            idle_cycles: 0,
            last_publish: None,
            reported_instance: None,
            stats: SessionStats::default(),
            shutdown,
        }
    }

    /// Counters so far.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Current device state.
    pub fn state(&self) -> DeviceState {
        self.lifecycle.state()
    }

    /// Runs until a quit event or cancellation, then closes the device and
    /// the connection.
    pub async fn run(mut self) -> SessionStats {
        info!(
            "Starting publish loop (publish every {:?}, tick {:?}, idle {:?})",
            self.timing.publish_interval, self.timing.tick_interval, self.timing.idle_interval
        );

        self.discover();
        self.report_state(true);

        loop {
            let pause = match self.tick().await {
                TickOutcome::Quit => break,
                TickOutcome::Idle => self.timing.idle_interval,
                TickOutcome::Waiting | TickOutcome::Published => self.timing.tick_interval,
            };

            tokio::select! {
                _ = sleep(pause) => {}
                _ = self.shutdown.cancelled() => {}
            }
        }

        self.finish().await;
        self.stats
    }

    /// Executes one loop iteration without the trailing sleep.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.drain_events() {
            return TickOutcome::Quit;
        }

        if self.lifecycle.state() == DeviceState::NoDevice {
            self.idle_cycles += 1;
            if self.idle_cycles % u64::from(self.timing.idle_retry_cycles) == 0 {
                debug!("Retrying discovery after {} idle cycles", self.idle_cycles);
                self.discover();
                self.report_state(false);
            }
            return TickOutcome::Idle;
        }

        let now = Instant::now();
        let due = self
            .last_publish
            .map_or(true, |last| now.duration_since(last) >= self.timing.publish_interval);
        if !due {
            return TickOutcome::Waiting;
        }

        if self.publish().await {
            self.last_publish = Some(now);
            TickOutcome::Published
        } else {
            TickOutcome::Waiting
        }
    }

    /// Applies every pending event. Returns true if a quit was requested.
    fn drain_events(&mut self) -> bool {
        let mut quit = self.shutdown.is_cancelled();

        for event in self.backend.poll_events() {
            debug!("Event: {}", event);
            match event {
                SystemEvent::DeviceAdded { instance_id } => {
                    if self.lifecycle.state() == DeviceState::NoDevice {
                        info!("Device added (instance {}), attempting discovery", instance_id);
                        self.discover();
                    }
                }
                SystemEvent::DeviceRemoved { instance_id } => {
                    self.lifecycle.handle_removed(instance_id);
                }
                SystemEvent::Quit => {
                    info!("Received quit event, shutting down...");
                    quit = true;
                }
            }
        }

        self.report_state(false);
        quit
    }

    fn discover(&mut self) -> Discovery {
        self.stats.discovery_attempts += 1;
        self.lifecycle.discover(self.backend.as_mut())
    }

    /// Tells the console about a changed device, or the current state when
    /// `force` is set.
    fn report_state(&mut self, force: bool) {
        let current = self.lifecycle.descriptor().map(|d| d.instance_id);
        if !force && current == self.reported_instance {
            return;
        }
        self.reported_instance = current;

        let state = self.lifecycle.state();
        info!("Device state: {}", state);
        self.display.state_changed(state);
    }

    /// Samples the open device and publishes one frame. Returns false if the
    /// tick produced nothing.
    async fn publish(&mut self) -> bool {
        let Some((descriptor, device)) = self.lifecycle.device_mut() else {
            return false;
        };

        let sample = match device.read_axes() {
            Ok(sample) => sample,
            Err(e) => {
                error!("{}", e);
                return false;
            }
        };
        let frame =
            ControlFrame::from_sample(&sample, &self.mapping, descriptor, Local::now().fixed_offset());

        let (line, pretty) = match (
            self.encoder.encode_line(&frame),
            self.encoder.encode_pretty(&frame),
        ) {
            (Ok(line), Ok(pretty)) => (line, pretty),
            (Err(e), _) | (_, Err(e)) => {
                error!("{}", e);
                return false;
            }
        };

        let block = self.encoder.status_block(&frame, &self.mapping);
        self.display.frame(&pretty, &block);

        match self.transport.send(&line).await {
            Ok(SendStatus::Sent) => self.stats.frames_sent += 1,
            Ok(SendStatus::Skipped) => {}
            Err(e) => error!("{}", e),
        }

        self.stats.frames_published += 1;
        if self.stats.frames_published % LOG_INTERVAL_FRAMES == 0 {
            info!(
                "Published {} frames ({} sent, stream {})",
                self.stats.frames_published,
                self.stats.frames_sent,
                if self.transport.is_connected() { "connected" } else { "disabled" }
            );
        }
        true
    }

    async fn finish(&mut self) {
        self.lifecycle.close();
        self.transport.close().await;
        info!(
            "Total frames published: {}, sent: {}, discovery attempts: {}",
            self.stats.frames_published, self.stats.frames_sent, self.stats.discovery_attempts
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::backend::{DeviceInfo, InputDevice};
    use crate::controller::normalize::AxisSample;
    use crate::error::{BridgeError, Result};
    use crate::stream::writer::mocks::MockFrameWriter;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    enum Action {
        Plug(DeviceInfo),
        Unplug(u32),
        Quit,
    }

    struct FakeState {
        started: Instant,
        script: VecDeque<(Duration, Action)>,
        devices: Vec<DeviceInfo>,
        axes: Vec<i16>,
        read_error: bool,
        enumerate_calls: usize,
        reads: usize,
        dropped: usize,
    }

    /// Backend driven by a timeline on the paused clock
    #[derive(Clone)]
    struct FakeBackend {
        state: Arc<Mutex<FakeState>>,
    }

    impl FakeBackend {
        fn new(devices: Vec<DeviceInfo>, axes: Vec<i16>) -> Self {
            Self {
                state: Arc::new(Mutex::new(FakeState {
                    started: Instant::now(),
                    script: VecDeque::new(),
                    devices,
                    axes,
                    read_error: false,
                    enumerate_calls: 0,
                    reads: 0,
                    dropped: 0,
                })),
            }
        }

        /// Actions must be scheduled in time order
        fn at(self, millis: u64, action: Action) -> Self {
            self.state
                .lock()
                .unwrap()
                .script
                .push_back((Duration::from_millis(millis), action));
            self
        }

        fn enumerate_calls(&self) -> usize {
            self.state.lock().unwrap().enumerate_calls
        }

        fn reads(&self) -> usize {
            self.state.lock().unwrap().reads
        }

        fn dropped(&self) -> usize {
            self.state.lock().unwrap().dropped
        }
    }

    impl InputBackend for FakeBackend {
        fn poll_events(&mut self) -> Vec<SystemEvent> {
            let mut state = self.state.lock().unwrap();
            let elapsed = state.started.elapsed();
            let mut events = Vec::new();
            while state.script.front().is_some_and(|(at, _)| *at <= elapsed) {
                let Some((_, action)) = state.script.pop_front() else { break };
                match action {
                    Action::Plug(info) => {
                        events.push(SystemEvent::DeviceAdded { instance_id: info.instance_id });
                        state.devices.push(info);
                    }
                    Action::Unplug(instance_id) => {
                        state.devices.retain(|d| d.instance_id != instance_id);
                        events.push(SystemEvent::DeviceRemoved { instance_id });
                    }
                    Action::Quit => events.push(SystemEvent::Quit),
                }
            }
            events
        }

        fn enumerate(&mut self) -> Vec<DeviceInfo> {
            let mut state = self.state.lock().unwrap();
            state.enumerate_calls += 1;
            state.devices.clone()
        }

        fn open(&mut self, info: &DeviceInfo) -> Result<Box<dyn InputDevice>> {
            Ok(Box::new(FakeDevice {
                instance_id: info.instance_id,
                name: info.name.clone(),
                state: self.state.clone(),
            }))
        }
    }

    struct FakeDevice {
        instance_id: u32,
        name: String,
        state: Arc<Mutex<FakeState>>,
    }

    impl InputDevice for FakeDevice {
        fn instance_id(&self) -> u32 {
            self.instance_id
        }

        fn name(&self) -> &str {
            &self.name
        }

        fn guid(&self) -> String {
            "03000000091200004f54000011010000".to_string()
        }

        fn read_axes(&mut self) -> Result<AxisSample> {
            let mut state = self.state.lock().unwrap();
            state.reads += 1;
            if state.read_error {
                return Err(BridgeError::DeviceRead("No such device".to_string()));
            }
            Ok(AxisSample::new(state.axes.clone()))
        }
    }

    impl Drop for FakeDevice {
        fn drop(&mut self) {
            if let Ok(mut state) = self.state.lock() {
                state.dropped += 1;
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingDisplay {
        frames: Arc<Mutex<Vec<(String, String)>>>,
        states: Arc<Mutex<Vec<DeviceState>>>,
    }

    impl StatusDisplay for RecordingDisplay {
        fn frame(&mut self, pretty: &str, block: &str) {
            self.frames.lock().unwrap().push((pretty.to_string(), block.to_string()));
        }

        fn state_changed(&mut self, state: DeviceState) {
            self.states.lock().unwrap().push(state);
        }
    }

    fn pocket(instance_id: u32) -> DeviceInfo {
        DeviceInfo {
            index: 0,
            instance_id,
            name: "RadioMaster Pocket Joystick".to_string(),
            path: "/dev/input/event5".to_string(),
        }
    }

    fn session(backend: &FakeBackend, transport: StreamTransport) -> (Session, RecordingDisplay) {
        let display = RecordingDisplay::default();
        let session = Session::new(
            &Config::default(),
            Box::new(backend.clone()),
            transport,
            Box::new(display.clone()),
            CancellationToken::new(),
        );
        (session, display)
    }

    fn mock_transport() -> (StreamTransport, MockFrameWriter) {
        let mock = MockFrameWriter::new();
        let transport = StreamTransport::with_writer(
            Box::new(mock.clone()),
            "mock:9000".to_string(),
            Duration::from_millis(250),
        );
        (transport, mock)
    }

    #[test]
    fn test_timing_defaults() {
        let timing = Timing::default();
        assert_eq!(timing.publish_interval, Duration::from_millis(100));
        assert_eq!(timing.tick_interval, Duration::from_millis(50));
        assert_eq!(timing.idle_interval, Duration::from_millis(200));
        assert_eq!(timing.idle_retry_cycles, 10);
        assert_eq!(Timing::from(&TimingConfig::default()), timing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_cadence_over_one_second() {
        let backend = FakeBackend::new(vec![pocket(1)], vec![0; 4]).at(1000, Action::Quit);
        let (transport, mock) = mock_transport();
        let (session, display) = session(&backend, transport);

        let stats = session.run().await;

        assert!(
            (9..=10).contains(&stats.frames_published),
            "published {} frames",
            stats.frames_published
        );
        assert_eq!(stats.frames_sent, stats.frames_published);
        assert_eq!(mock.get_written_data().len() as u64, stats.frames_published);
        assert_eq!(display.frames.lock().unwrap().len() as u64, stats.frames_published);
        assert_eq!(*display.states.lock().unwrap(), vec![DeviceState::Open]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_device_retries_every_ten_idle_cycles() {
        // 50 idle iterations of 200 ms, then quit
        let backend = FakeBackend::new(Vec::new(), vec![0; 4]).at(10_000, Action::Quit);
        let (session, display) = session(&backend, StreamTransport::disabled());

        let stats = session.run().await;

        assert_eq!(stats.frames_published, 0);
        assert_eq!(stats.discovery_attempts, 6, "initial attempt plus 5 retries");
        assert_eq!(backend.enumerate_calls(), 6);
        assert_eq!(backend.reads(), 0);
        assert_eq!(*display.states.lock().unwrap(), vec![DeviceState::NoDevice]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_device_added_mid_run_opens_and_publishes() {
        let backend = FakeBackend::new(Vec::new(), vec![0; 4])
            .at(300, Action::Plug(pocket(4)))
            .at(1000, Action::Quit);
        let (transport, mock) = mock_transport();
        let (session, display) = session(&backend, transport);

        let stats = session.run().await;

        assert_eq!(
            *display.states.lock().unwrap(),
            vec![DeviceState::NoDevice, DeviceState::Open]
        );
        assert_eq!(stats.discovery_attempts, 2);
        assert!(stats.frames_published > 0);
        assert_eq!(mock.get_written_data().len() as u64, stats.frames_published);
    }

    #[tokio::test(start_paused = true)]
    async fn test_published_frame_values() {
        let backend = FakeBackend::new(vec![pocket(1)], vec![0, 0, 16383, -16384]).at(50, Action::Quit);
        let (transport, mock) = mock_transport();
        let (session, display) = session(&backend, transport);

        let stats = session.run().await;
        assert_eq!(stats.frames_published, 1);

        let written = mock.get_written_data();
        assert_eq!(written.len(), 1);
        let line = &written[0];
        assert_eq!(line.last(), Some(&b'\n'));
        let parsed: serde_json::Value = serde_json::from_slice(line).unwrap();
        assert_eq!(parsed["left_stick"]["yaw"], -0.5);
        assert_eq!(parsed["left_stick"]["throttle"], 0.75);
        assert_eq!(parsed["right_stick"]["pitch"], 0.0);
        assert_eq!(parsed["right_stick"]["roll"], 0.0);
        assert_eq!(parsed["device"]["name"], "RadioMaster Pocket Joystick");
        assert_eq!(parsed["device"]["index"], 0);

        let frames = display.frames.lock().unwrap();
        assert!(frames[0].1.contains("Throttle (axis 2): mapped=[0..1] = 0.750"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_stops_further_attempts() {
        let backend = FakeBackend::new(vec![pocket(1)], vec![0; 4]).at(1000, Action::Quit);
        let (transport, mock) = mock_transport();
        mock.set_write_error(io::ErrorKind::BrokenPipe);
        let (session, display) = session(&backend, transport);

        let stats = session.run().await;

        assert_eq!(mock.write_attempts(), 1);
        assert_eq!(stats.frames_sent, 0);
        assert!(stats.frames_published >= 9, "console mirror keeps running");
        assert_eq!(display.frames.lock().unwrap().len() as u64, stats.frames_published);
        assert_eq!(mock.shutdown_calls(), 0, "failed writer is dropped, not shut down");
    }

    #[tokio::test(start_paused = true)]
    async fn test_removal_processed_before_sampling() {
        let backend = FakeBackend::new(vec![pocket(7)], vec![0; 4])
            .at(250, Action::Unplug(7))
            .at(1000, Action::Quit);
        let (session, display) = session(&backend, StreamTransport::disabled());

        let stats = session.run().await;

        // Publishes at 0, 100 and 200 ms; the 250 ms tick sees the removal first
        assert_eq!(stats.frames_published, 3);
        assert_eq!(backend.reads(), 3);
        assert_eq!(backend.dropped(), 1);
        assert_eq!(
            *display.states.lock().unwrap(),
            vec![DeviceState::Open, DeviceState::NoDevice]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_removal_of_other_instance_is_ignored() {
        let backend = FakeBackend::new(vec![pocket(7)], vec![0; 4])
            .at(250, Action::Unplug(99))
            .at(1000, Action::Quit);
        let (session, display) = session(&backend, StreamTransport::disabled());

        let stats = session.run().await;

        assert_eq!(stats.frames_published, 10);
        assert_eq!(backend.dropped(), 1, "closed once at shutdown");
        assert_eq!(*display.states.lock().unwrap(), vec![DeviceState::Open]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_failure_skips_publish() {
        let backend = FakeBackend::new(vec![pocket(1)], vec![0; 4]).at(1000, Action::Quit);
        backend.state.lock().unwrap().read_error = true;
        let (transport, mock) = mock_transport();
        let (session, _display) = session(&backend, transport);

        let stats = session.run().await;

        assert_eq!(stats.frames_published, 0);
        assert!(backend.reads() > 0);
        assert!(mock.get_written_data().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_ends_run_and_cleans_up() {
        let backend = FakeBackend::new(vec![pocket(1)], vec![0; 4]);
        let (transport, mock) = mock_transport();
        let token = CancellationToken::new();
        let session = Session::new(
            &Config::default(),
            Box::new(backend.clone()),
            transport,
            Box::new(RecordingDisplay::default()),
            token.clone(),
        );
        token.cancel();

        let stats = session.run().await;

        assert_eq!(stats.frames_published, 0);
        assert_eq!(backend.dropped(), 1);
        assert_eq!(mock.shutdown_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_outcomes() {
        let backend = FakeBackend::new(vec![pocket(1)], vec![0; 4]);
        let (mut session, _display) = session(&backend, StreamTransport::disabled());

        assert_eq!(session.tick().await, TickOutcome::Idle);
        assert_eq!(session.state(), DeviceState::NoDevice);

        session.discover();
        assert_eq!(session.tick().await, TickOutcome::Published);
        assert_eq!(session.tick().await, TickOutcome::Waiting);

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(session.tick().await, TickOutcome::Published);
        assert_eq!(session.stats().frames_published, 2);
        assert_eq!(session.stats().frames_sent, 0);
    }
}
