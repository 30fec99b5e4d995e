//! # Stream Transport Module
//!
//! Sends encoded control frames to a TCP peer.
//!
//! This module handles:
//! - Connecting once at startup, bounded by a connect timeout
//! - Writing newline-terminated frames, bounded by a send timeout
//! - Closing the connection for good on the first failed send
//!
//! There is no reconnect. After a connect or send failure the transport stays
//! disabled for the rest of the run and every send is skipped, while the
//! session keeps sampling and mirroring frames to the console.

pub mod writer;

use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};
use writer::{FrameWriter, TcpFrameWriter};

/// What happened to a frame handed to [`StreamTransport::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// The frame was written to the peer.
    Sent,
    /// No connection exists; the frame was dropped.
    Skipped,
}

/// Outbound frame stream.
pub struct StreamTransport {
    /// Connection handle; `None` once closed or never connected
    writer: Option<Box<dyn FrameWriter>>,
    /// Peer address (e.g., 127.0.0.1:9000)
    peer: String,
    send_timeout: Duration,
    frames_sent: u64,
}

impl std::fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("peer", &self.peer)
            .field("connected", &self.is_connected())
            .field("frames_sent", &self.frames_sent)
            .finish_non_exhaustive()
    }
}

impl StreamTransport {
    /// Connect to the stream peer
    ///
    /// # Arguments
    ///
    /// * `host` - Peer host name or address
    /// * `port` - Peer TCP port
    /// * `connect_timeout` - Upper bound for establishing the connection
    /// * `send_timeout` - Upper bound for each later send
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Connect`] if the peer refuses or cannot be
    /// resolved, [`BridgeError::ConnectTimeout`] if it does not answer in time.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use rc_joystick_bridge::stream::StreamTransport;
    ///
    /// #[tokio::main(flavor = "current_thread")]
    /// async fn main() -> anyhow::Result<()> {
    ///     let mut transport = StreamTransport::connect(
    ///         "127.0.0.1",
    ///         9000,
    ///         Duration::from_secs(2),
    ///         Duration::from_millis(250),
    ///     )
    ///     .await?;
    ///     transport.send(b"{}\n").await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        send_timeout: Duration,
    ) -> Result<Self> {
        let peer = format!("{}:{}", host, port);
        info!("Connecting to {} via TCP", peer);

        let stream = match timeout(connect_timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(BridgeError::Connect {
                    peer,
                    reason: e.to_string(),
                })
            }
            Err(_) => return Err(BridgeError::ConnectTimeout(peer)),
        };

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Failed to set TCP_NODELAY on {}: {}", peer, e);
        }

        info!("Connected to {}", peer);
        Ok(Self::with_writer(Box::new(TcpFrameWriter::new(stream)), peer, send_timeout))
    }

    /// Transport over an existing writer
    pub fn with_writer(writer: Box<dyn FrameWriter>, peer: String, send_timeout: Duration) -> Self {
        Self {
            writer: Some(writer),
            peer,
            send_timeout,
            frames_sent: 0,
        }
    }

    /// Transport with no connection; every send is skipped
    pub fn disabled() -> Self {
        Self {
            writer: None,
            peer: String::new(),
            send_timeout: Duration::ZERO,
            frames_sent: 0,
        }
    }

    /// Returns true while a connection exists
    pub fn is_connected(&self) -> bool {
        self.writer.is_some()
    }

    /// Peer address, empty for a disabled transport
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Frames written since the connection was made
    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    /// Send one encoded frame
    ///
    /// # Arguments
    ///
    /// * `frame` - Newline-terminated frame bytes
    ///
    /// # Returns
    ///
    /// * `Ok(SendStatus::Sent)` - Written and flushed
    /// * `Ok(SendStatus::Skipped)` - No connection
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Send`] or [`BridgeError::SendTimeout`]. The
    /// connection is closed before the error is returned and is never
    /// reopened.
    pub async fn send(&mut self, frame: &[u8]) -> Result<SendStatus> {
        let Some(writer) = self.writer.as_mut() else {
            return Ok(SendStatus::Skipped);
        };

        let outcome = timeout(self.send_timeout, async {
            writer.write_all(frame).await?;
            writer.flush().await
        })
        .await;

        let error = match outcome {
            Ok(Ok(())) => {
                self.frames_sent += 1;
                debug!("Sent frame ({} bytes)", frame.len());
                return Ok(SendStatus::Sent);
            }
            Ok(Err(e)) => BridgeError::Send(e.to_string()),
            Err(_) => BridgeError::SendTimeout(self.send_timeout.as_millis() as u64),
        };

        warn!("Closing stream to {} after send failure", self.peer);
        // Dropping the writer closes the socket
        self.writer = None;
        Err(error)
    }

    /// Close the connection gracefully, if one exists
    pub async fn close(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            match timeout(self.send_timeout, writer.shutdown()).await {
                Ok(Ok(())) => info!("Closed stream to {} ({} frames sent)", self.peer, self.frames_sent),
                Ok(Err(e)) => debug!("Shutdown of stream to {} failed: {}", self.peer, e),
                Err(_) => debug!("Shutdown of stream to {} timed out", self.peer),
            }
        }
    }
}
