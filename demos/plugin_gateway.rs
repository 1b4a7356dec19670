//! A gateway customised through plugins.
//!
//! - `/healthz` and `/metrics` extra routes (Prometheus text format)
//! - a start updater that forces every session onto one jump host
//! - an error scope that logs failed connection attempts
//!
//! ```text
//! cargo run --example plugin_gateway -- 127.0.0.1:2222
//! ```

use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;

use webssh_gateway::observability::init_logging;
use webssh_gateway::plugins::{ConnectOutcome, ConnectionOverrides, ErrorScope, RequestContext};
use webssh_gateway::routing::RouteEntry;
use webssh_gateway::{GatewayOptions, Plugins};

/// Logs the outcome of one connection request, leaves it unchanged.
struct AuditScope {
    client: std::net::SocketAddr,
}

impl ErrorScope for AuditScope {
    fn exit(self: Box<Self>, outcome: ConnectOutcome) -> ConnectOutcome {
        match &outcome {
            Ok(id) => tracing::info!(client = %self.client, session = %id, "Session opened"),
            Err(e) => tracing::warn!(client = %self.client, error = %e, "Session refused"),
        }
        outcome
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(false);

    let jump_host = std::env::args().nth(1).unwrap_or_else(|| "127.0.0.1:22".to_string());
    let (host, port) = match jump_host.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.parse::<u16>()?),
        None => (jump_host.clone(), 22),
    };

    let prometheus = PrometheusBuilder::new().install_recorder()?;

    let plugins = Plugins::new()
        .with_route(RouteEntry::new("/healthz", get(|| async { "ok" })))
        .with_route(RouteEntry::new(
            "/metrics",
            get(move || {
                let prometheus = prometheus.clone();
                async move { prometheus.render() }
            }),
        ))
        .with_conn_start_updater(move |request: RequestContext| {
            let (host, port) = (host.clone(), port);
            async move {
                tracing::debug!(client = %request.client_addr(), "Routing session to jump host");
                Ok(ConnectionOverrides {
                    hostname: Some(host),
                    port: Some(port),
                    ..Default::default()
                })
            }
        })
        .with_conn_error_handler(|request: &RequestContext| {
            Box::new(AuditScope {
                client: request.client_addr(),
            }) as Box<dyn ErrorScope>
        });

    let options = GatewayOptions {
        address: "127.0.0.1".into(),
        settings: [("plugin".to_string(), serde_json::json!("plugin_gateway"))].into(),
        ..Default::default()
    };

    webssh_gateway::run(options, plugins)?;
    Ok(())
}
