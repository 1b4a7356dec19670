//! Web-based SSH gateway.
//!
//! Serves a connection form over HTTP(S), opens the transport to the remote
//! host on request, and relays the session over a websocket.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────────────────────────────────────────────────┐
//!                 │                     GATEWAY                           │
//!                 │                                                       │
//!   Browser       │  ┌──────────┐   ┌──────────┐   ┌──────────────────┐  │
//!   ──────────────┼─▶│   net    │──▶│   http   │──▶│ handlers (/, /ws)│──┼──▶ Remote host
//!                 │  │listeners │   │ app + mw │   │ + session table  │  │    (socket builder)
//!                 │  └──────────┘   └──────────┘   └──────────────────┘  │
//!                 │        ▲              ▲                  ▲            │
//!                 │  ┌─────┴──────────────┴──────────────────┴─────────┐  │
//!                 │  │ lifecycle (bootstrap) · routing · plugins ·     │  │
//!                 │  │ config · security · observability               │  │
//!                 │  └─────────────────────────────────────────────────┘  │
//!                 └──────────────────────────────────────────────────────┘
//! ```
//!
//! Operators customise the gateway through [`plugins::Plugins`] and start it
//! with [`run`] or [`Gateway`].

// Core subsystems
pub mod config;
pub mod error;
pub mod http;
pub mod net;
pub mod plugins;
pub mod routing;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatewayOptions;
pub use error::{GatewayError, Result};
pub use lifecycle::{run, Gateway, LoopHandle};
pub use plugins::Plugins;
