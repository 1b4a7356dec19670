//! Index handler: the connection form and the connect endpoint.
//!
//! # Connect flow
//! ```text
//! POST / (form)
//!     → access checks, origin check
//!     → ConnectionRequestArgs (port defaults to 22)
//!     → conn_start_updater overrides
//!     → host key policy, per-client connection cap
//!     → socket builder connects the channel
//!     → session parked; expires after `delay` unless claimed
//!     → {"id", "status", "encoding"}
//! ```
//! Everything after the origin check runs inside the operator's error scope.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Form, FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, MethodRouter};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use super::Inbound;
use crate::error::{GatewayError, Result};
use crate::lifecycle::LoopHandle;
use crate::plugins::hooks::run_in_scope;
use crate::plugins::{ConnectOutcome, ConnectionRequestArgs, DirectTcp, Plugins, RequestContext, SocketBuilder};
use crate::routing::HandlerFactory;
use crate::security::host_keys::{HostKeyPolicy, HostKeySettings};

const DEFAULT_SSH_PORT: u16 = 22;

const FORM_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>WebSSH</title></head>
<body>
<form id="connect" method="post" action="/">
  <label>Hostname <input name="hostname" required></label>
  <label>Port <input name="port" type="number" value="22" min="1" max="65535"></label>
  <label>Username <input name="username" required></label>
  <label>Password <input name="password" type="password"></label>
  <label>Private key <textarea name="privatekey"></textarea></label>
  <button type="submit">Connect</button>
</form>
</body>
</html>
"#;

/// Body of the connect response. Fields are `null` when not applicable.
#[derive(Debug, Default, Serialize)]
struct ConnectResponse {
    id: Option<String>,
    status: Option<String>,
    encoding: Option<String>,
}

/// Factory for the `/` route.
#[derive(Clone)]
pub struct IndexHandler {
    loop_handle: LoopHandle,
    policy: HostKeyPolicy,
    host_keys: Arc<HostKeySettings>,
    plugins: Arc<Plugins>,
}

impl IndexHandler {
    pub fn new(
        loop_handle: LoopHandle,
        policy: HostKeyPolicy,
        host_keys: Arc<HostKeySettings>,
        plugins: Arc<Plugins>,
    ) -> Self {
        Self {
            loop_handle,
            policy,
            host_keys,
            plugins,
        }
    }

    async fn form(self, request: Request) -> Response {
        let (parts, _body) = request.into_parts();
        let inbound = Inbound::from_parts(&parts);
        if let Some(response) = inbound.screen(&parts.uri, &self.loop_handle) {
            return response;
        }
        Html(FORM_PAGE).into_response()
    }

    async fn connect(self, request: Request) -> Response {
        let (parts, body) = request.into_parts();
        let inbound = Inbound::from_parts(&parts);
        if let Some(response) = inbound.screen(&parts.uri, &self.loop_handle) {
            return response;
        }
        if !inbound.origin_allowed(&parts.headers) {
            return (StatusCode::FORBIDDEN, "Cross origin operation is not allowed.").into_response();
        }

        let (method, uri, headers) = (parts.method.clone(), parts.uri.clone(), parts.headers.clone());
        let arguments =
            match Form::<HashMap<String, String>>::from_request(Request::from_parts(parts, body), &()).await {
                Ok(Form(arguments)) => arguments,
                Err(rejection) => return rejection.into_response(),
            };

        let context = RequestContext::new(
            method,
            uri,
            headers,
            inbound.client,
            inbound.listener.scheme,
            arguments,
        );

        let outcome = run_in_scope(
            &self.plugins.conn_error_handler,
            &context,
            self.open_session(&context),
        )
        .await;

        match outcome {
            Ok(id) => {
                metrics::counter!("webssh_connections_total", "outcome" => "ok").increment(1);
                Json(ConnectResponse {
                    id: Some(id.to_string()),
                    status: None,
                    encoding: Some(self.loop_handle.options().encoding.clone()),
                })
                .into_response()
            }
            Err(e) => {
                metrics::counter!("webssh_connections_total", "outcome" => "error").increment(1);
                tracing::warn!(client = %context.client_addr(), error = %e, "Connection request failed");
                let body = ConnectResponse {
                    status: Some(e.to_string()),
                    ..Default::default()
                };
                (e.status_code(), Json(body)).into_response()
            }
        }
    }

    async fn open_session(&self, context: &RequestContext) -> ConnectOutcome {
        let options = self.loop_handle.options();
        let mut args = connection_args(context)?;

        if let Some(updater) = &self.plugins.conn_start_updater {
            let overrides = updater(context.clone()).await?;
            if !overrides.is_empty() {
                tracing::debug!(
                    hostname = ?overrides.hostname,
                    port = ?overrides.port,
                    username = ?overrides.username,
                    "Applying connection overrides"
                );
                overrides.apply(&mut args);
                check_args(&args)?;
            }
        }

        self.policy.admit(&self.host_keys, &args.hostname, args.port)?;

        let client = context.client_addr().ip();
        let sessions = self.loop_handle.sessions();
        let guard = sessions
            .tracker()
            .try_track(client, options.max_connections_per_client)
            .ok_or_else(|| GatewayError::Forbidden("Too many live connections.".into()))?;

        tracing::info!(
            client = %context.client_addr(),
            hostname = %args.hostname,
            port = args.port,
            username = %args.username,
            "Connecting"
        );
        let stream = match &self.plugins.socket_builder {
            Some(builder) => builder.connect(&args).await?,
            None => DirectTcp::new(options.connect_timeout).connect(&args).await?,
        };

        let id = sessions.insert(stream, guard);
        self.schedule_expiry(id);
        Ok(id)
    }

    fn schedule_expiry(&self, id: Uuid) {
        let sessions = self.loop_handle.sessions().clone();
        let delay = self.loop_handle.options().session_delay;
        self.loop_handle.spawn(async move {
            tokio::time::sleep(delay).await;
            sessions.expire(id);
        });
    }
}

impl HandlerFactory for IndexHandler {
    fn method_router(&self) -> MethodRouter {
        let form = self.clone();
        let connect = self.clone();
        get(move |request: Request| {
            let handler = form.clone();
            async move { handler.form(request).await }
        })
        .post(move |request: Request| {
            let handler = connect.clone();
            async move { handler.connect(request).await }
        })
    }

    fn name(&self) -> &str {
        "index"
    }
}

/// Read the standard form arguments of a connect request.
pub fn connection_args(context: &RequestContext) -> Result<ConnectionRequestArgs> {
    let hostname = context
        .argument("hostname")
        .ok_or_else(|| GatewayError::InvalidRequest("Missing value hostname".into()))?;
    let username = context
        .argument("username")
        .ok_or_else(|| GatewayError::InvalidRequest("Missing value username".into()))?;
    let port = match context.argument("port") {
        None => DEFAULT_SSH_PORT,
        Some(port) => port
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| GatewayError::InvalidRequest(format!("Invalid port: {port}")))?,
    };

    let args = ConnectionRequestArgs {
        hostname: hostname.to_string(),
        port,
        username: username.to_string(),
        password: context.arguments().get("password").cloned().filter(|p| !p.is_empty()),
        private_key: context.argument("privatekey").map(str::to_string),
        request: context.clone(),
    };
    check_args(&args)?;
    Ok(args)
}

fn check_args(args: &ConnectionRequestArgs) -> Result<()> {
    if !is_valid_hostname(&args.hostname) {
        return Err(GatewayError::InvalidRequest(format!(
            "Invalid hostname: {}",
            args.hostname
        )));
    }
    if args.port == 0 {
        return Err(GatewayError::InvalidRequest("Invalid port: 0".into()));
    }
    if args.username.is_empty() {
        return Err(GatewayError::InvalidRequest("Missing value username".into()));
    }
    Ok(())
}

fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }
    let hostname = hostname.strip_suffix('.').unwrap_or(hostname);
    !hostname.is_empty()
        && hostname.len() <= 253
        && hostname.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
