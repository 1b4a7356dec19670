//! Transports used to reach the remote host.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::{GatewayError, Result};
use crate::plugins::ConnectionRequestArgs;

/// A connected, socket-like duplex byte channel.
pub trait DuplexStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> DuplexStream for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Owned channel returned by a [`SocketBuilder`].
pub type BoxedStream = Box<dyn DuplexStream>;

/// Opens the byte channel to `(hostname, port)` for one connection attempt.
///
/// The caller owns the returned channel and closes it by dropping it.
/// Failures are reported as [`GatewayError::Connect`]; the gateway never
/// retries.
#[async_trait]
pub trait SocketBuilder: Send + Sync {
    async fn connect(&self, args: &ConnectionRequestArgs) -> Result<BoxedStream>;
}

/// Plain TCP transport, used when no socket builder is configured.
#[derive(Debug, Clone)]
pub struct DirectTcp {
    timeout: Duration,
}

impl DirectTcp {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl SocketBuilder for DirectTcp {
    async fn connect(&self, args: &ConnectionRequestArgs) -> Result<BoxedStream> {
        let connect_error = |reason: String| GatewayError::Connect {
            hostname: args.hostname.clone(),
            port: args.port,
            reason,
        };

        let stream = tokio::time::timeout(
            self.timeout,
            TcpStream::connect((args.hostname.as_str(), args.port)),
        )
        .await
        .map_err(|_| connect_error("connection timed out".into()))?
        .map_err(|e| connect_error(e.to_string()))?;

        stream.set_nodelay(true)?;

        tracing::debug!(
            hostname = %args.hostname,
            port = args.port,
            "Transport connected"
        );

        Ok(Box::new(stream))
    }
}
