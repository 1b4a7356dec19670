//! Resolved runtime settings.
//!
//! Options are flat operator input; this module turns them into the typed
//! values the application builder, the listeners and the handlers consume.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::time::Duration;

use crate::config::schema::GatewayOptions;
use crate::error::{GatewayError, Result};
use crate::net::tls::TlsContext;

/// Fallback handlers the application builder can install.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultHandler {
    /// Answer 404 for every unrouted path.
    NotFound,
}

/// Settings consumed by the application builder.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub debug: bool,
    /// Interval between websocket pings, `None` when disabled.
    pub websocket_ping_interval: Option<Duration>,
    pub origin_policy: OriginPolicy,
    pub request_timeout: Duration,
    /// Installed by the application builder.
    pub default_handler: Option<DefaultHandler>,
    /// Opaque values passed through to an operator application factory.
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl AppSettings {
    pub fn from_options(options: &GatewayOptions) -> Result<Self> {
        Ok(Self {
            debug: options.debug,
            websocket_ping_interval: (options.wpintvl > 0)
                .then(|| Duration::from_secs(options.wpintvl)),
            origin_policy: OriginPolicy::parse(&options.origin, options.debug)?,
            request_timeout: Duration::from_secs(options.request_timeout),
            default_handler: None,
            extra: options.settings.clone(),
        })
    }
}

/// Which browser origins may open sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginPolicy {
    /// Origin must equal the Host header.
    Same,
    /// Origin must share the primary domain with the Host header.
    Primary,
    /// Any origin. Only allowed in debug mode.
    Any,
    /// Explicit allow list of origins.
    Allowed(BTreeSet<String>),
}

impl OriginPolicy {
    pub fn parse(origin: &str, debug: bool) -> Result<Self> {
        let origin = origin.trim();
        if origin == "*" {
            if !debug {
                return Err(GatewayError::Config(
                    "wildcard origin policy is only allowed in debug mode".into(),
                ));
            }
            return Ok(Self::Any);
        }

        match origin.to_lowercase().as_str() {
            "same" => Ok(Self::Same),
            "primary" => Ok(Self::Primary),
            list => {
                let allowed: BTreeSet<String> = list
                    .split(',')
                    .map(|o| o.trim().trim_end_matches('/').to_string())
                    .filter(|o| !o.is_empty())
                    .collect();
                if allowed.is_empty() {
                    return Err(GatewayError::Config("empty origin list".into()));
                }
                Ok(Self::Allowed(allowed))
            }
        }
    }

    /// Check an `Origin` header value against the request's `Host` header.
    pub fn allows(&self, origin: &str, host: &str) -> bool {
        let origin = origin.trim().to_lowercase();
        let host = host.trim().to_lowercase();

        match self {
            Self::Any => true,
            Self::Allowed(list) => list.contains(origin.trim_end_matches('/')),
            Self::Same => origin_netloc(&origin).is_some_and(|netloc| netloc == host),
            Self::Primary => origin_netloc(&origin).is_some_and(|netloc| {
                primary_domain(strip_port(&netloc)) == primary_domain(strip_port(&host))
            }),
        }
    }
}

fn origin_netloc(origin: &str) -> Option<String> {
    let url = url::Url::parse(origin).ok()?;
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}

fn primary_domain(host: &str) -> String {
    if host.parse::<IpAddr>().is_ok() {
        return host.to_string();
    }
    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    let start = labels.len().saturating_sub(2);
    labels[start..].join(".")
}

/// Options consumed by `Application::listen`.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Resolve client addresses from proxy headers.
    pub xheaders: bool,
    pub max_body_size: usize,
    /// Only these clients may use the gateway. Empty allows everyone.
    pub trusted_downstream: Vec<IpAddr>,
    /// Operator asked for plaintext→HTTPS redirection.
    pub redirect: bool,
    /// TLS material; its presence turns the listener into HTTPS.
    pub tls: Option<TlsContext>,
}

impl ServerOptions {
    pub fn from_options(options: &GatewayOptions) -> Result<Self> {
        Ok(Self {
            xheaders: options.xheaders,
            max_body_size: options.max_body_size,
            trusted_downstream: parse_trusted_downstream(&options.tdstream)?,
            redirect: options.redirect,
            tls: None,
        })
    }
}

fn parse_trusted_downstream(tdstream: &str) -> Result<Vec<IpAddr>> {
    tdstream
        .split(',')
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(|ip| {
            ip.parse()
                .map_err(|_| GatewayError::Config(format!("invalid trusted downstream {ip:?}")))
        })
        .collect()
}

/// Per-connection behaviour of the built-in handlers.
#[derive(Debug, Clone)]
pub struct HandlerOptions {
    /// Encoding reported to the browser for session output.
    pub encoding: String,
    pub connect_timeout: Duration,
    /// How long a connected session waits for its websocket.
    pub session_delay: Duration,
    pub max_connections_per_client: usize,
    /// Forbid plaintext requests from public addresses.
    pub forbid_public_http: bool,
}

impl HandlerOptions {
    pub fn from_options(options: &GatewayOptions) -> Self {
        let encoding = if options.encoding.is_empty() {
            "utf-8".to_string()
        } else {
            encoding_rs::Encoding::for_label(options.encoding.as_bytes())
                .map(|e| e.name().to_lowercase())
                .unwrap_or_else(|| options.encoding.clone())
        };

        Self {
            encoding,
            connect_timeout: Duration::from_secs(options.timeout),
            session_delay: Duration::from_secs(options.delay),
            max_connections_per_client: options.maxconn,
            forbid_public_http: options.fbidhttp,
        }
    }
}
