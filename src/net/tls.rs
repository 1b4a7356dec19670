//! TLS configuration and certificate loading.

use std::fmt;
use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;

use crate::config::GatewayOptions;
use crate::error::{GatewayError, Result};

/// TLS material for an HTTPS listener.
#[derive(Clone)]
pub struct TlsContext {
    config: RustlsConfig,
    cert_path: PathBuf,
}

impl TlsContext {
    /// Wrap an already built rustls configuration.
    pub fn new(config: RustlsConfig, cert_path: impl Into<PathBuf>) -> Self {
        Self {
            config,
            cert_path: cert_path.into(),
        }
    }

    pub fn rustls_config(&self) -> RustlsConfig {
        self.config.clone()
    }

    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }
}

impl fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContext")
            .field("cert_path", &self.cert_path)
            .finish_non_exhaustive()
    }
}

/// Resolve the TLS context configured in `options`.
///
/// Returns `Ok(None)` when neither certificate nor key is configured.
pub async fn get_ssl_context(options: &GatewayOptions) -> Result<Option<TlsContext>> {
    match (options.certfile.is_empty(), options.keyfile.is_empty()) {
        (true, true) => Ok(None),
        (false, false) => {
            let cert_path = Path::new(&options.certfile);
            let config = load_tls_config(cert_path, Path::new(&options.keyfile)).await?;
            Ok(Some(TlsContext::new(config, cert_path)))
        }
        (true, false) => Err(GatewayError::Tls("certfile is not provided".into())),
        (false, true) => Err(GatewayError::Tls("keyfile is not provided".into())),
    }
}

/// Load TLS configuration from certificate and key files.
pub async fn load_tls_config(cert_path: &Path, key_path: &Path) -> Result<RustlsConfig> {
    if !cert_path.is_file() {
        return Err(GatewayError::Tls(format!(
            "certificate file not found: {}",
            cert_path.display()
        )));
    }
    if !key_path.is_file() {
        return Err(GatewayError::Tls(format!(
            "private key file not found: {}",
            key_path.display()
        )));
    }

    let cert = tokio::fs::read(cert_path).await?;
    let key = tokio::fs::read(key_path).await?;

    // Parse up front so a bad file names itself instead of failing inside rustls.
    let certs = rustls_pemfile::certs(&mut cert.as_slice())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| GatewayError::Tls(format!("{}: {e}", cert_path.display())))?;
    if certs.is_empty() {
        return Err(GatewayError::Tls(format!(
            "no certificate found in {}",
            cert_path.display()
        )));
    }
    match rustls_pemfile::private_key(&mut key.as_slice()) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Err(GatewayError::Tls(format!(
                "no private key found in {}",
                key_path.display()
            )))
        }
        Err(e) => return Err(GatewayError::Tls(format!("{}: {e}", key_path.display()))),
    }

    // Several rustls providers can be compiled in; pin the one axum-server uses.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    RustlsConfig::from_pem(cert, key)
        .await
        .map_err(|e| GatewayError::Tls(e.to_string()))
}
