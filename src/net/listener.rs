//! Listener orchestration.
//!
//! # Responsibilities
//! - Ask the application to listen on an address/port
//! - Classify the listener as HTTP or HTTPS from its server options
//! - Publish the HTTPS redirect target once a TLS listener is up
//! - Keep started listeners in the server registry
//!
//! # Design Decisions
//! - Bind failures are returned, never retried
//! - The registry is a plain Vec: it is only written during sequential
//!   bootstrap. Parallelising bootstrap would require revisiting this.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::ServerOptions;
use crate::error::Result;
use crate::http::application::Application;

/// Protocol scheme served by a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-listener facts attached to every request it accepts.
#[derive(Debug, Clone, Default)]
pub struct ListenerInfo {
    pub scheme: Scheme,
    pub xheaders: bool,
    pub trusted_downstream: Arc<[IpAddr]>,
}

impl ListenerInfo {
    pub fn new(options: &ServerOptions) -> Self {
        Self {
            scheme: if options.tls.is_some() {
                Scheme::Https
            } else {
                Scheme::Http
            },
            xheaders: options.xheaders,
            trusted_downstream: options.trusted_downstream.clone().into(),
        }
    }
}

/// Where plaintext requests should be redirected, once known.
///
/// Set by [`start_listener`] when a TLS listener starts and the operator asked
/// for redirection; read by the built-in handlers.
#[derive(Debug, Clone, Default)]
pub struct HttpsRedirect {
    port: Arc<OnceLock<u16>>,
}

impl HttpsRedirect {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self, https_port: u16) {
        if self.port.set(https_port).is_err() {
            tracing::warn!(https_port, "HTTPS redirect target already set");
        }
    }

    /// The HTTPS port to redirect to, if redirection is on.
    pub fn target(&self) -> Option<u16> {
        self.port.get().copied()
    }

    pub fn is_enabled(&self) -> bool {
        self.port.get().is_some()
    }
}

/// A socket an application is serving on.
pub struct BoundListener {
    local_addr: SocketAddr,
    handle: axum_server::Handle,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl BoundListener {
    pub fn new(
        local_addr: SocketAddr,
        handle: axum_server::Handle,
        task: Option<JoinHandle<std::io::Result<()>>>,
    ) -> Self {
        Self {
            local_addr,
            handle,
            task,
        }
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// A started listener, as recorded in the server registry.
pub struct ListenerHandle {
    scheme: Scheme,
    address: String,
    port: u16,
    bound: BoundListener,
}

impl ListenerHandle {
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Address as configured.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Port as configured. May be 0; see [`ListenerHandle::local_addr`].
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.bound.local_addr
    }

    /// Connections currently open on this listener.
    pub fn connection_count(&self) -> usize {
        self.bound.handle.connection_count()
    }

    /// Stop accepting and let open connections finish within `grace`.
    pub fn shutdown(&self, grace: Duration) {
        self.bound.handle.graceful_shutdown(Some(grace));
    }

    fn take_task(&mut self) -> Option<JoinHandle<std::io::Result<()>>> {
        self.bound.task.take()
    }
}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerHandle")
            .field("scheme", &self.scheme)
            .field("address", &self.address)
            .field("port", &self.port)
            .field("local_addr", &self.bound.local_addr)
            .finish()
    }
}

/// Listeners started by the bootstrap, in start order.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    servers: Vec<ListenerHandle>,
}

impl ServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, server: ListenerHandle) {
        self.servers.push(server);
    }

    pub fn servers(&self) -> &[ListenerHandle] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Signal every listener to stop and hand back their serving tasks.
    pub fn shutdown_all(&mut self, grace: Duration) -> Vec<JoinHandle<std::io::Result<()>>> {
        self.servers
            .iter_mut()
            .filter_map(|server| {
                server.shutdown(grace);
                server.take_task()
            })
            .collect()
    }
}

/// Start one listener for `app` and classify it.
pub fn start_listener(
    app: &dyn Application,
    port: u16,
    address: &str,
    options: &ServerOptions,
    redirect: &HttpsRedirect,
) -> Result<ListenerHandle> {
    let bound = app.listen(port, address, options)?;

    let scheme = if options.tls.is_none() {
        Scheme::Http
    } else {
        if options.redirect {
            redirect.enable(bound.local_addr.port());
        }
        Scheme::Https
    };

    tracing::info!(
        address = %address,
        port,
        local_addr = %bound.local_addr,
        scheme = %scheme,
        "Listening on {}:{} ({})",
        address,
        port,
        scheme
    );
    metrics::counter!("webssh_listeners_started", "scheme" => scheme.as_str()).increment(1);

    Ok(ListenerHandle {
        scheme,
        address: address.to_string(),
        port,
        bound,
    })
}
