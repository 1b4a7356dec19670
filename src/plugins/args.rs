//! Connection request arguments and the request handle passed to hooks.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderMap, Method, Uri};
use serde::Deserialize;

use crate::net::listener::Scheme;

/// Read-only handle on the inbound request that started a connection attempt.
///
/// Cloning is cheap. Hooks receive it so they can read non-standard form
/// arguments or headers; nothing in the gateway mutates it.
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<RequestInfo>,
}

struct RequestInfo {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    client_addr: SocketAddr,
    scheme: Scheme,
    arguments: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        client_addr: SocketAddr,
        scheme: Scheme,
        arguments: HashMap<String, String>,
    ) -> Self {
        Self {
            inner: Arc::new(RequestInfo {
                method,
                uri,
                headers,
                client_addr,
                scheme,
                arguments,
            }),
        }
    }

    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// Client address, after proxy header resolution.
    pub fn client_addr(&self) -> SocketAddr {
        self.inner.client_addr
    }

    /// Scheme of the listener the request arrived on.
    pub fn scheme(&self) -> Scheme {
        self.inner.scheme
    }

    /// A submitted form argument, trimmed. Empty values read as absent.
    pub fn argument(&self, name: &str) -> Option<&str> {
        self.inner
            .arguments
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn arguments(&self) -> &HashMap<String, String> {
        &self.inner.arguments
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.inner.method)
            .field("uri", &self.inner.uri)
            .field("client_addr", &self.inner.client_addr)
            .field("scheme", &self.inner.scheme)
            .finish_non_exhaustive()
    }
}

/// Arguments for one connection attempt to a remote host.
#[derive(Clone)]
pub struct ConnectionRequestArgs {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    pub password: Option<String>,
    pub private_key: Option<String>,
    /// The originating request.
    pub request: RequestContext,
}

impl fmt::Debug for ConnectionRequestArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Credentials never reach the logs.
        f.debug_struct("ConnectionRequestArgs")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("private_key", &self.private_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Replacement values for connection arguments, returned by a start updater.
///
/// Deserializable so an updater can build it from a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionOverrides {
    pub hostname: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub private_key: Option<String>,
}

impl ConnectionOverrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Replace every field of `args` this value carries.
    pub fn apply(self, args: &mut ConnectionRequestArgs) {
        if let Some(hostname) = self.hostname {
            args.hostname = hostname;
        }
        if let Some(port) = self.port {
            args.port = port;
        }
        if let Some(username) = self.username {
            args.username = username;
        }
        if self.password.is_some() {
            args.password = self.password;
        }
        if self.private_key.is_some() {
            args.private_key = self.private_key;
        }
    }
}

#[cfg(test)]
pub(crate) fn test_context(arguments: &[(&str, &str)]) -> RequestContext {
    RequestContext::new(
        Method::POST,
        Uri::from_static("/"),
        HeaderMap::new(),
        "127.0.0.1:50000".parse().unwrap(),
        Scheme::Http,
        arguments
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    )
}
