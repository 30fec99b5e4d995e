//! Trait abstraction for the outbound byte stream to enable testing

use async_trait::async_trait;
use std::io;
use tokio::net::TcpStream;

/// Trait for stream I/O operations
#[async_trait]
pub trait FrameWriter: Send {
    /// Write all data to the peer
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush buffered output
    async fn flush(&mut self) -> io::Result<()>;

    /// Shut down the write half gracefully
    async fn shutdown(&mut self) -> io::Result<()>;
}

/// Wrapper around tokio::net::TcpStream that implements FrameWriter
pub struct TcpFrameWriter {
    stream: TcpStream,
}

impl TcpFrameWriter {
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl FrameWriter for TcpFrameWriter {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.stream.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.stream.flush().await
    }

    async fn shutdown(&mut self) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.stream.shutdown().await
    }
}
