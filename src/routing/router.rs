//! Route composition.
//!
//! # Responsibilities
//! - Merge operator routes with the built-in index and websocket routes
//! - Bind built-in handlers to their construction arguments
//!
//! # Design Decisions
//! - Operator routes come first, so they win on pattern collisions
//! - The operator's list is copied, never aliased
//! - Pure: no I/O, no errors

use std::sync::Arc;

use crate::http::handlers::{IndexHandler, WsockHandler};
use crate::lifecycle::LoopHandle;
use crate::plugins::Plugins;
use crate::routing::{RouteEntry, RouteTable};
use crate::security::host_keys::{HostKeyPolicy, HostKeySettings};

/// Path of the built-in connection form / connect endpoint.
pub const INDEX_PATH: &str = "/";

/// Path of the built-in websocket relay.
pub const WEBSOCKET_PATH: &str = "/ws";

/// Build the ordered route table: operator routes, then `/`, then `/ws`.
pub fn compose_routes(
    plugins: &Arc<Plugins>,
    loop_handle: &LoopHandle,
    policy: HostKeyPolicy,
    host_keys: Arc<HostKeySettings>,
) -> RouteTable {
    let mut routes = RouteTable::from(plugins.handlers.clone());

    routes.push(RouteEntry::new(
        INDEX_PATH,
        IndexHandler::new(loop_handle.clone(), policy, host_keys, Arc::clone(plugins)),
    ));
    routes.push(RouteEntry::new(
        WEBSOCKET_PATH,
        WsockHandler::new(loop_handle.clone()),
    ));

    tracing::debug!(routes = ?routes.patterns(), "Routes composed");
    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandlerOptions;
    use crate::config::GatewayOptions;
    use axum::routing::get;

    fn loop_handle(rt: &tokio::runtime::Runtime) -> LoopHandle {
        LoopHandle::new(
            rt.handle().clone(),
            HandlerOptions::from_options(&GatewayOptions::default()),
        )
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn extra_routes_come_first_then_builtins() {
        let rt = runtime();
        let plugins = Arc::new(
            Plugins::new()
                .with_route(RouteEntry::new("/healthz", get(|| async { "ok" })))
                .with_route(RouteEntry::new("/", get(|| async { "custom index" })))
                .with_route(RouteEntry::new("/metrics", get(|| async { "" }))),
        );

        let routes = compose_routes(
            &plugins,
            &loop_handle(&rt),
            HostKeyPolicy::Warning,
            Arc::new(HostKeySettings::default()),
        );

        assert_eq!(routes.len(), plugins.handlers.len() + 2);
        assert_eq!(routes.patterns(), ["/healthz", "/", "/metrics", "/", "/ws"]);
        let names: Vec<&str> = routes.iter().map(RouteEntry::name).collect();
        assert_eq!(names[3..], ["index", "websocket"]);
    }

    #[test]
    fn composition_copies_the_bundle() {
        let rt = runtime();
        let plugins = Arc::new(
            Plugins::new().with_route(RouteEntry::new("/healthz", get(|| async { "ok" }))),
        );
        let handle = loop_handle(&rt);
        let host_keys = Arc::new(HostKeySettings::default());

        let mut first = compose_routes(&plugins, &handle, HostKeyPolicy::Warning, host_keys.clone());
        let second = compose_routes(&plugins, &handle, HostKeyPolicy::Warning, host_keys);
        first.push(RouteEntry::new("/late", get(|| async { "" })));

        assert_eq!(plugins.handlers.len(), 1);
        assert_eq!(second.patterns(), ["/healthz", "/", "/ws"]);
        assert_eq!(first.len(), second.len() + 1);
    }

    #[test]
    fn empty_bundle_yields_only_builtins() {
        let rt = runtime();
        let routes = compose_routes(
            &Arc::new(Plugins::default()),
            &loop_handle(&rt),
            HostKeyPolicy::AutoAdd,
            Arc::new(HostKeySettings::default()),
        );
        assert_eq!(routes.patterns(), [INDEX_PATH, WEBSOCKET_PATH]);
    }
}
