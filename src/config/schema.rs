//! Configuration schema definitions.
//!
//! Every field has a default so an empty TOML file, or no file at all, yields
//! a gateway listening in plaintext on port 8888.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root options for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayOptions {
    /// Plaintext listen address. Empty means all interfaces.
    pub address: String,

    /// Plaintext listen port.
    pub port: u16,

    /// TLS listen address. Empty means all interfaces.
    pub ssladdress: String,

    /// TLS listen port.
    pub sslport: u16,

    /// PEM certificate chain for the TLS listener.
    pub certfile: String,

    /// PEM private key for the TLS listener.
    pub keyfile: String,

    /// Debug mode: verbose logging, wildcard origin allowed.
    pub debug: bool,

    /// Missing host key policy: `reject`, `autoadd` or `warning`.
    pub policy: String,

    /// Host keys file for the gateway itself.
    pub hostfile: String,

    /// System-wide known hosts file.
    pub syshostfile: String,

    /// Comma separated trusted downstream addresses. Empty trusts everyone.
    pub tdstream: String,

    /// Redirect plaintext requests to HTTPS when the TLS listener is up.
    pub redirect: bool,

    /// Forbid plaintext requests from public networks.
    pub fbidhttp: bool,

    /// Trust `X-Real-Ip` / `X-Forwarded-For` for the client address.
    pub xheaders: bool,

    /// Origin policy: `same`, `primary`, `*` or a comma separated list.
    pub origin: String,

    /// Websocket ping interval in seconds. 0 disables pings.
    pub wpintvl: u64,

    /// Transport connect timeout in seconds.
    pub timeout: u64,

    /// Seconds a connected session waits for its websocket before being closed.
    pub delay: u64,

    /// Maximum concurrent sessions per client address.
    pub maxconn: usize,

    /// Character encoding forced on sessions. Empty means utf-8.
    pub encoding: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,

    /// Per-request timeout in seconds.
    pub request_timeout: u64,

    /// Opaque application settings passed through to the application factory.
    pub settings: BTreeMap<String, serde_json::Value>,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: 8888,
            ssladdress: String::new(),
            sslport: 4433,
            certfile: String::new(),
            keyfile: String::new(),
            debug: false,
            policy: "warning".to_string(),
            hostfile: String::new(),
            syshostfile: String::new(),
            tdstream: String::new(),
            redirect: true,
            fbidhttp: true,
            xheaders: true,
            origin: "same".to_string(),
            wpintvl: 0,
            timeout: 3,
            delay: 3,
            maxconn: 20,
            encoding: String::new(),
            max_body_size: 1024 * 1024,
            request_timeout: 30,
            settings: BTreeMap::new(),
        }
    }
}

impl GatewayOptions {
    /// Whether TLS material was configured at all.
    pub fn tls_requested(&self) -> bool {
        !self.certfile.is_empty() || !self.keyfile.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let options: GatewayOptions = toml::from_str(
            r#"
            port = 9000
            origin = "primary"

            [settings]
            font = "Hack"
            "#,
        )
        .unwrap();

        assert_eq!(options.port, 9000);
        assert_eq!(options.origin, "primary");
        assert_eq!(options.sslport, 4433);
        assert_eq!(options.policy, "warning");
        assert!(options.redirect);
        assert_eq!(options.settings["font"], serde_json::json!("Hack"));
        assert!(!options.tls_requested());
    }
}
