//! Extension contract.
//!
//! # Extension points
//! ```text
//! Plugins
//!     socket_builder      → transport used to reach the remote host
//!     handlers            → extra routes, evaluated before the built-ins
//!     app_factory         → replaces the web application
//!     conn_start_updater  → overrides connection arguments per request
//!     conn_error_handler  → scope around each connection request
//! ```
//!
//! # Design Decisions
//! - Every field is independently optional; defaults apply at the point of use
//! - No cross-field validation
//! - Built once at startup, then shared read-only behind an `Arc`

pub mod args;
pub mod hooks;
pub mod socket;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub use args::{ConnectionOverrides, ConnectionRequestArgs, RequestContext};
pub use hooks::{
    conn_start_updater, default_error_handler, ConnErrorHandler, ConnStartUpdater, ConnectOutcome,
    ErrorScope, PassThrough,
};
pub use socket::{BoxedStream, DirectTcp, DuplexStream, SocketBuilder};

use crate::error::Result;
use crate::http::application::AppFactory;
use crate::routing::RouteEntry;

/// The operator-supplied bundle of customisations.
#[derive(Clone)]
pub struct Plugins {
    /// Transport override. `None` uses [`DirectTcp`].
    pub socket_builder: Option<Arc<dyn SocketBuilder>>,
    /// Extra routes, same shape as the built-in ones.
    pub handlers: Vec<RouteEntry>,
    /// Builds the application from the route table and settings.
    pub app_factory: Option<AppFactory>,
    /// Produces argument overrides before a connection starts.
    pub conn_start_updater: Option<ConnStartUpdater>,
    /// Scope wrapped around each connection request.
    pub conn_error_handler: ConnErrorHandler,
}

impl Default for Plugins {
    fn default() -> Self {
        Self {
            socket_builder: None,
            handlers: Vec::new(),
            app_factory: None,
            conn_start_updater: None,
            conn_error_handler: default_error_handler(),
        }
    }
}

impl Plugins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_socket_builder(mut self, builder: impl SocketBuilder + 'static) -> Self {
        self.socket_builder = Some(Arc::new(builder));
        self
    }

    /// Append an extra route. Earlier routes win on pattern collisions.
    pub fn with_route(mut self, route: RouteEntry) -> Self {
        self.handlers.push(route);
        self
    }

    pub fn with_app_factory(mut self, factory: AppFactory) -> Self {
        self.app_factory = Some(factory);
        self
    }

    pub fn with_conn_start_updater<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ConnectionOverrides>> + Send + 'static,
    {
        self.conn_start_updater = Some(conn_start_updater(f));
        self
    }

    pub fn with_conn_error_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> Box<dyn ErrorScope> + Send + Sync + 'static,
    {
        self.conn_error_handler = Arc::new(f);
        self
    }
}

impl fmt::Debug for Plugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugins")
            .field("socket_builder", &self.socket_builder.is_some())
            .field("handlers", &self.handlers)
            .field("app_factory", &self.app_factory.is_some())
            .field("conn_start_updater", &self.conn_start_updater.is_some())
            .finish_non_exhaustive()
    }
}
