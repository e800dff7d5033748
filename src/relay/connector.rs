//! Origin connections.
//!
//! The relay never opens sockets itself; it asks a [`Connect`]
//! implementation for a byte stream to `host:port`. Production uses
//! [`TcpConnector`], tests substitute their own.

use std::future::Future;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::trace;

/// Opens a byte stream to an origin server.
pub trait Connect: Send + Sync + 'static {
    /// The stream type handed back to the relay
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Connects to `host:port`, resolving the host name if needed.
    fn connect(&self, host: &str, port: u16)
        -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Connects to origins over TCP, any address family.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connect for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((host, port)).await?;
        stream.set_nodelay(true)?;
        trace!(host = host, port = port, "Connected to origin");
        Ok(stream)
    }
}
