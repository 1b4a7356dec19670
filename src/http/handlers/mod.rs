//! Built-in request handlers.
//!
//! # Routes
//! ```text
//! GET  /        → index.rs (connection form)
//! POST /        → index.rs (open a session, answer its id)
//! GET  /ws?id=  → websocket.rs (claim the session, relay bytes)
//! *             → not_found (fallback)
//! ```

pub mod index;
pub mod websocket;

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{header, request::Parts, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Redirect, Response};

pub use index::IndexHandler;
pub use websocket::WsockHandler;

use crate::config::{AppSettings, OriginPolicy};
use crate::lifecycle::LoopHandle;
use crate::net::ListenerInfo;
use crate::security::access::{check_request, resolve_client_addr, Verdict};

/// Fallback for unrouted paths.
pub async fn not_found(uri: Uri) -> impl IntoResponse {
    tracing::debug!(path = %uri.path(), "No route matched");
    (StatusCode::NOT_FOUND, "404: Not Found")
}

/// What the built-in handlers know about an inbound request.
///
/// Read from request extensions so the handlers also work inside an operator
/// application that installs fewer layers.
pub(crate) struct Inbound {
    pub listener: ListenerInfo,
    /// Socket peer.
    pub peer: SocketAddr,
    /// Client address after proxy header resolution.
    pub client: SocketAddr,
    pub host: String,
    pub settings: Option<Arc<AppSettings>>,
}

impl Inbound {
    pub fn from_parts(parts: &Parts) -> Self {
        let listener = parts.extensions.get::<ListenerInfo>().cloned().unwrap_or_default();
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0)
            .unwrap_or_else(|| SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)));
        let client = resolve_client_addr(&parts.headers, peer, listener.xheaders);
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.authority().map(|a| a.as_str()))
            .unwrap_or_default()
            .to_string();

        Self {
            listener,
            peer,
            client,
            host,
            settings: parts.extensions.get::<Arc<AppSettings>>().cloned(),
        }
    }

    /// Run the access checks. `Some` is the response that ends the request.
    pub fn screen(&self, uri: &Uri, loop_handle: &LoopHandle) -> Option<Response> {
        let verdict = check_request(
            &self.listener,
            self.peer.ip(),
            &self.host,
            uri,
            loop_handle.redirect(),
            loop_handle.options().forbid_public_http,
        );
        match verdict {
            Verdict::Allow => None,
            Verdict::Redirect(location) => {
                tracing::debug!(client = %self.client, location = %location, "Redirecting to HTTPS");
                Some(Redirect::temporary(&location).into_response())
            }
            Verdict::Forbid(reason) => {
                tracing::warn!(client = %self.client, reason = %reason, "Request forbidden");
                Some((StatusCode::FORBIDDEN, reason).into_response())
            }
        }
    }

    /// Requests without an `Origin` header are not browser cross-origin
    /// requests and pass.
    pub fn origin_allowed(&self, headers: &HeaderMap) -> bool {
        let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) else {
            return true;
        };
        let allowed = match &self.settings {
            Some(settings) => settings.origin_policy.allows(origin, &self.host),
            None => OriginPolicy::Same.allows(origin, &self.host),
        };
        if !allowed {
            tracing::warn!(client = %self.client, origin, host = %self.host, "Cross origin request refused");
        }
        allowed
    }
}
