//! The web application and its builder.
//!
//! # Responsibilities
//! - Turn an ordered route table into one axum `Router`
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Bind listeners and spawn their accept loops on the event loop
//! - Delegate construction to an operator application factory when present
//!
//! # Design Decisions
//! - First route for a pattern wins; later duplicates are skipped with a warning
//! - One router can be served by several listeners; per-listener facts travel
//!   in a `ListenerInfo` request extension
//! - Sockets bind synchronously so bind failures surface during bootstrap

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::validation::bind_address;
use crate::config::{AppSettings, DefaultHandler, ServerOptions};
use crate::error::{GatewayError, Result};
use crate::http::handlers::not_found;
use crate::net::{BoundListener, ListenerInfo};
use crate::plugins::Plugins;
use crate::routing::RouteTable;

/// Something that can serve HTTP on a socket.
pub trait Application: Send + Sync {
    /// Bind `address:port` and start serving on the current event loop.
    ///
    /// Must be called from within the gateway's runtime context.
    fn listen(&self, port: u16, address: &str, options: &ServerOptions) -> Result<BoundListener>;
}

/// Operator hook that builds the application instead of [`WebApplication`].
pub type AppFactory =
    Arc<dyn Fn(RouteTable, AppSettings) -> Result<Box<dyn Application>> + Send + Sync>;

/// The default application: an axum router over the route table.
pub struct WebApplication {
    router: Router,
    settings: Arc<AppSettings>,
}

impl WebApplication {
    pub fn new(routes: RouteTable, settings: AppSettings) -> Self {
        let settings = Arc::new(settings);
        let mut router = Router::new();
        let mut seen = HashSet::new();

        for entry in &routes {
            if !entry.pattern().starts_with('/') {
                tracing::warn!(pattern = entry.pattern(), "Skipping route without leading '/'");
                continue;
            }
            if !seen.insert(entry.pattern()) {
                tracing::warn!(
                    pattern = entry.pattern(),
                    handler = entry.name(),
                    "Skipping route shadowed by an earlier entry"
                );
                continue;
            }
            router = router.route(entry.pattern(), entry.factory().method_router());
        }

        if settings.default_handler == Some(DefaultHandler::NotFound) {
            router = router.fallback(not_found);
        }

        let router = Self::apply_layers(router, &settings);
        Self { router, settings }
    }

    #[allow(deprecated)]
    fn apply_layers(router: Router, settings: &Arc<AppSettings>) -> Router {
        router.layer(Extension(Arc::clone(settings))).layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(settings.request_timeout)),
        )
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }
}

impl Application for WebApplication {
    fn listen(&self, port: u16, address: &str, options: &ServerOptions) -> Result<BoundListener> {
        let bind_error = |source| GatewayError::Bind {
            address: address.to_string(),
            port,
            source,
        };

        let listener = std::net::TcpListener::bind((bind_address(address), port)).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;
        let local_addr = listener.local_addr()?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| GatewayError::Runtime(format!("no event loop to listen on: {e}")))?;

        let app = self
            .router
            .clone()
            .layer(Extension(ListenerInfo::new(options)))
            .layer(RequestBodyLimitLayer::new(options.max_body_size))
            .into_make_service_with_connect_info::<SocketAddr>();

        let handle = axum_server::Handle::new();
        let task = match &options.tls {
            None => {
                let server = axum_server::from_tcp(listener).handle(handle.clone());
                runtime.spawn(server.serve(app))
            }
            Some(tls) => {
                let server =
                    axum_server::from_tcp_rustls(listener, tls.rustls_config()).handle(handle.clone());
                runtime.spawn(server.serve(app))
            }
        };

        tracing::debug!(local_addr = %local_addr, tls = options.tls.is_some(), "Socket bound");
        Ok(BoundListener::new(local_addr, handle, Some(task)))
    }
}

/// Build the application that will serve `routes`.
///
/// Always installs the not-found default handler in `settings`, then hands
/// both to the operator's factory when one is configured.
pub fn build_application(
    routes: RouteTable,
    mut settings: AppSettings,
    plugins: &Plugins,
) -> Result<Box<dyn Application>> {
    settings.default_handler = Some(DefaultHandler::NotFound);

    match &plugins.app_factory {
        Some(factory) => {
            tracing::debug!(routes = routes.len(), "Building application with operator factory");
            factory(routes, settings)
        }
        None => Ok(Box::new(WebApplication::new(routes, settings))),
    }
}
