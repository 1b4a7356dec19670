//! Gateway error types.
//!
//! # Taxonomy
//! - Configuration (`Config`, `Encoding`, `Tls`): fatal, raised before any listener starts
//! - Bind: fatal for the listener being started; later listeners are never attempted
//! - Connect: local to one connection attempt, reported to the browser
//! - Extension: raised by an operator hook, routed through the error scope

use axum::http::StatusCode;
use thiserror::Error;

/// Errors produced by the gateway core and its built-in handlers.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Invalid option value.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown character encoding name.
    #[error("unknown character encoding {0:?}")]
    Encoding(String),

    /// TLS material could not be resolved.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A listener could not be bound.
    #[error("failed to bind {address}:{port}: {source}")]
    Bind {
        address: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The event loop could not be created or is not available.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// The transport could not reach the remote host.
    #[error("unable to connect to {hostname}:{port}: {reason}")]
    Connect {
        hostname: String,
        port: u16,
        reason: String,
    },

    /// Malformed connection request.
    #[error("{0}")]
    InvalidRequest(String),

    /// Request rejected by an access check.
    #[error("{0}")]
    Forbidden(String),

    /// Operator-supplied hook failed.
    #[error("extension error: {0}")]
    Extension(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// HTTP status used when this error ends a request.
    ///
    /// Transport failures still answer 200: the browser reads the reason
    /// from the `status` field of the JSON body.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Connect { .. } => StatusCode::OK,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether this error must abort startup.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Encoding(_) | Self::Tls(_) | Self::Bind { .. } | Self::Runtime(_)
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GatewayError>;
