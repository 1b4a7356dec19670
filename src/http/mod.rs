//! HTTP layer subsystem.
//!
//! # Data Flow
//! ```text
//! Route table (routing)
//!     → application.rs (axum Router + middleware, or operator factory)
//!     → listener (net) serves it on one or more sockets
//!     → handlers/ (index, websocket, not found)
//!     → session.rs (connected channels awaiting their websocket)
//! ```
//!
//! # Design Decisions
//! - Middleware stack: request ID → tracing → timeout, body limit per listener
//! - Handlers read per-listener facts from request extensions

pub mod application;
pub mod handlers;
pub mod session;

pub use application::{build_application, AppFactory, Application, WebApplication};
pub use session::{ClaimedSession, SessionStore};
