//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → command line overrides (main.rs)
//!     → validation.rs (semantic checks)
//!     → GatewayOptions (validated, immutable)
//!     → settings.rs (AppSettings, ServerOptions, HandlerOptions)
//! ```
//!
//! # Design Decisions
//! - Options are immutable once the gateway starts; no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod settings;
pub mod validation;

pub use schema::GatewayOptions;
pub use settings::{AppSettings, DefaultHandler, HandlerOptions, OriginPolicy, ServerOptions};
