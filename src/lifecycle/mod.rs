//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Check encoding → Event loop → Host keys → Routes → Application
//!     → TLS → Listeners
//!
//! Serving (event_loop.rs):
//!     LoopHandle shared by the built-in handlers
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → Stop accepting → Drain connections → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup, listeners last (traffic only when ready)
//! - Shutdown has a grace period, then open connections are dropped

pub mod event_loop;
pub mod shutdown;
pub mod startup;

pub use event_loop::LoopHandle;
pub use startup::{run, Gateway};
