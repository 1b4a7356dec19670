//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap:
//!     → host_keys.rs (known_hosts files, missing-host-key policy)
//!
//! Incoming request:
//!     → access.rs (trusted downstream, plaintext redirect/forbid)
//!     → origin policy (config::settings)
//!     → Pass to handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Access checks trust the socket peer, not proxy headers

pub mod access;
pub mod host_keys;
