//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, listen addresses parse)
//! - Detect conflicting listeners
//! - Reject unknown character encodings before anything else starts
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayOptions → Result<(), Vec<ValidationError>>
//! - Runs before options are accepted into the system

use std::net::IpAddr;

use crate::config::schema::GatewayOptions;
use crate::error::{GatewayError, Result};

/// A single semantic problem found in the options.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Check that `encoding` names a character encoding the relay can use.
///
/// An empty name means the default (utf-8) and is accepted.
pub fn check_encoding_setting(encoding: &str) -> Result<()> {
    if encoding.is_empty() || encoding_rs::Encoding::for_label(encoding.as_bytes()).is_some() {
        Ok(())
    } else {
        Err(GatewayError::Encoding(encoding.to_string()))
    }
}

/// Resolve an empty listen address to the wildcard address.
pub fn bind_address(address: &str) -> &str {
    if address.is_empty() {
        "0.0.0.0"
    } else {
        address
    }
}

fn is_valid_listen_address(address: &str) -> bool {
    address.is_empty() || address == "localhost" || address.parse::<IpAddr>().is_ok()
}

/// Validate options, collecting every problem found.
pub fn validate_options(options: &GatewayOptions) -> std::result::Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_valid_listen_address(&options.address) {
        errors.push(ValidationError::new(
            "address",
            format!("{:?} is not a valid listen address", options.address),
        ));
    }
    if !is_valid_listen_address(&options.ssladdress) {
        errors.push(ValidationError::new(
            "ssladdress",
            format!("{:?} is not a valid listen address", options.ssladdress),
        ));
    }

    if let Err(e) = check_encoding_setting(&options.encoding) {
        errors.push(ValidationError::new("encoding", e.to_string()));
    }

    for (field, value) in [
        ("timeout", options.timeout),
        ("delay", options.delay),
        ("request_timeout", options.request_timeout),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }
    if options.maxconn == 0 {
        errors.push(ValidationError::new("maxconn", "must be greater than zero"));
    }
    if options.max_body_size == 0 {
        errors.push(ValidationError::new("max_body_size", "must be greater than zero"));
    }

    if options.certfile.is_empty() != options.keyfile.is_empty() {
        errors.push(ValidationError::new(
            "certfile",
            "certfile and keyfile must be configured together",
        ));
    }

    if options.tls_requested()
        && options.port != 0
        && options.port == options.sslport
        && bind_address(&options.address) == bind_address(&options.ssladdress)
    {
        errors.push(ValidationError::new(
            "sslport",
            format!("TLS listener collides with plaintext listener on port {}", options.port),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_labels() {
        assert!(check_encoding_setting("").is_ok());
        assert!(check_encoding_setting("utf-8").is_ok());
        assert!(check_encoding_setting("latin1").is_ok());
        assert!(check_encoding_setting("GBK").is_ok());
        assert!(matches!(
            check_encoding_setting("utf-9"),
            Err(GatewayError::Encoding(name)) if name == "utf-9"
        ));
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_options(&GatewayOptions::default()).is_ok());
    }

    #[test]
    fn half_configured_tls_is_rejected() {
        let options = GatewayOptions {
            certfile: "cert.pem".into(),
            ..Default::default()
        };
        let errors = validate_options(&options).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "certfile");
    }

    #[test]
    fn listener_collision_is_rejected() {
        let options = GatewayOptions {
            certfile: "cert.pem".into(),
            keyfile: "key.pem".into(),
            port: 8443,
            sslport: 8443,
            ..Default::default()
        };
        let errors = validate_options(&options).unwrap_err();
        assert_eq!(errors[0].field, "sslport");
    }

    #[test]
    fn empty_address_binds_everywhere() {
        assert_eq!(bind_address(""), "0.0.0.0");
        assert_eq!(bind_address("127.0.0.1"), "127.0.0.1");
    }
}
