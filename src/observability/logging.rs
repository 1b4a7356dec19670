//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the default level from the `debug` option
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the built-in default filter
//! - Human-readable fmt output; the gateway is usually run in a terminal

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set.
pub fn default_filter(debug: bool) -> &'static str {
    if debug {
        "webssh_gateway=debug,tower_http=debug"
    } else {
        "webssh_gateway=info,tower_http=info"
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(debug: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(debug).into());

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(debug))
        .try_init();

    if result.is_err() {
        tracing::debug!("Logging already initialized");
    }
}
