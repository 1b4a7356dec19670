//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → `metrics` facade counters:
//!         webssh_listeners_started{scheme}
//!         webssh_connections_total{outcome}
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → whatever recorder the operator installs (none by default)
//! ```

pub mod logging;

pub use logging::init_logging;
