//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap
//!     → tls.rs (optional TLS material)
//!     → listener.rs (application.listen, classify http/https, registry)
//!     → axum-server accept loop on the event loop
//!     → connection.rs (per-client session slots)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Sockets are bound synchronously so bind errors surface during bootstrap
//! - One application may be served by several listeners
//! - TLS is optional; its absence skips the HTTPS listener, it is not an error

pub mod connection;
pub mod listener;
pub mod tls;

pub use listener::{
    start_listener, BoundListener, HttpsRedirect, ListenerHandle, ListenerInfo, Scheme,
    ServerRegistry,
};
pub use tls::TlsContext;
