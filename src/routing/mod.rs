//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Composition (at startup):
//!     Plugins.handlers (operator routes)
//!     → router.rs (copy, append index + websocket)
//!     → RouteTable (ordered)
//!     → application builder registers entries in order
//! ```
//!
//! # Design Decisions
//! - Route table built once at startup, immutable afterwards
//! - Deterministic order: operator routes, `/`, `/ws`
//! - First entry for a pattern wins; later duplicates are skipped

pub mod router;
pub mod table;

pub use router::{compose_routes, INDEX_PATH, WEBSOCKET_PATH};
pub use table::{HandlerFactory, RouteEntry, RouteTable};
