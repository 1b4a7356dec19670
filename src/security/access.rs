//! Inbound request checks shared by the built-in handlers.
//!
//! # Checks, in order
//! 1. Trusted downstream list: peers outside a non-empty list are forbidden
//! 2. Plaintext from a public address to a named host: redirected to HTTPS
//!    when the redirect target is set
//! 3. Plaintext from a public address: forbidden when `fbidhttp` is set
//!
//! The checks look at the socket peer, never at proxy headers.

use std::net::{IpAddr, SocketAddr};

use axum::http::{HeaderMap, Uri};

use crate::net::{HttpsRedirect, ListenerInfo, Scheme};

/// Result of checking one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Forbid(String),
    Redirect(String),
}

/// Check a request before any handler logic runs.
pub fn check_request(
    listener: &ListenerInfo,
    peer: IpAddr,
    host: &str,
    uri: &Uri,
    redirect: &HttpsRedirect,
    forbid_public_http: bool,
) -> Verdict {
    if !listener.trusted_downstream.is_empty() && !listener.trusted_downstream.contains(&peer) {
        return Verdict::Forbid(format!("IP address {peer} not in trusted downstream list"));
    }

    if listener.scheme == Scheme::Http && !is_private(peer) {
        let hostname = hostname_of(host);
        if let Some(https_port) = redirect.target() {
            if !hostname.is_empty() && hostname.parse::<IpAddr>().is_err() {
                let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
                return Verdict::Redirect(format!("https://{hostname}:{https_port}{path}"));
            }
        }
        if forbid_public_http {
            return Verdict::Forbid("public plain http request is forbidden".into());
        }
    }

    Verdict::Allow
}

/// Resolve the client address, honouring `X-Real-Ip` / `X-Real-Port` when
/// the listener trusts proxy headers.
pub fn resolve_client_addr(headers: &HeaderMap, peer: SocketAddr, xheaders: bool) -> SocketAddr {
    if !xheaders {
        return peer;
    }
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::trim);

    let forwarded = || {
        header("x-forwarded-for")
            .and_then(|list| list.split(',').next())
            .map(str::trim)
    };

    match header("x-real-ip")
        .or_else(forwarded)
        .and_then(|ip| ip.parse::<IpAddr>().ok())
    {
        Some(ip) => {
            let port = header("x-real-port")
                .and_then(|p| p.parse::<u16>().ok())
                .filter(|p| *p != 0)
                .unwrap_or(peer.port());
            SocketAddr::new(ip, port)
        }
        None => peer,
    }
}

/// Loopback, private, link-local and unique-local addresses.
pub fn is_private(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private(IpAddr::V4(v4));
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
    }
}

fn hostname_of(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, _)) => name,
        None => host,
    }
}
