//! Startup orchestration.
//!
//! # Steps
//! ```text
//! 1. encoding check, options   (fatal)
//! 2. event loop                (single-threaded tokio runtime)
//! 3. host key settings, policy
//! 4. route composition
//! 5. application
//! 6. TLS context, server options
//! 7. plaintext listener        (registry += 1)
//! 8. TLS listener, if TLS      (registry += 1)
//! 9. serve until a shutdown signal, then drain the registry
//! ```
//!
//! # Design Decisions
//! - Fail fast: the first error aborts startup, later steps never run
//! - Listeners are registered only once every step succeeds; a failed TLS
//!   bind stops the plaintext listener it already started
//! - Strictly sequential; serving tasks only make progress once step 9
//!   drives the loop

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;

use crate::config::validation::{check_encoding_setting, validate_options};
use crate::config::{AppSettings, GatewayOptions, HandlerOptions, ServerOptions};
use crate::error::{GatewayError, Result};
use crate::http::application::{build_application, Application};
use crate::lifecycle::shutdown::shutdown_signal;
use crate::lifecycle::LoopHandle;
use crate::net::tls::{get_ssl_context, TlsContext};
use crate::net::{start_listener, ListenerHandle, ServerRegistry};
use crate::plugins::Plugins;
use crate::routing::compose_routes;
use crate::security::host_keys::{get_host_keys_settings, get_policy_setting};

/// How long open connections get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A gateway instance: options, plugins and, once started, its event loop
/// and listeners.
pub struct Gateway {
    options: GatewayOptions,
    plugins: Arc<Plugins>,
    registry: ServerRegistry,
    runtime: Option<Runtime>,
    loop_handle: Option<LoopHandle>,
    application: Option<Box<dyn Application>>,
}

impl Gateway {
    pub fn new(options: GatewayOptions, plugins: Plugins) -> Self {
        Self {
            options,
            plugins: Arc::new(plugins),
            registry: ServerRegistry::new(),
            runtime: None,
            loop_handle: None,
            application: None,
        }
    }

    /// Run bootstrap steps 1 to 8.
    pub fn start(&mut self) -> Result<()> {
        if self.runtime.is_some() {
            return Err(GatewayError::Runtime("gateway already started".into()));
        }
        let options = &self.options;

        check_encoding_setting(&options.encoding)?;
        validate_options(options).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            GatewayError::Config(messages.join("; "))
        })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| GatewayError::Runtime(format!("failed to build event loop: {e}")))?;

        let host_keys = Arc::new(get_host_keys_settings(options)?);
        let policy = get_policy_setting(options, &host_keys)?;

        let loop_handle = LoopHandle::new(
            runtime.handle().clone(),
            HandlerOptions::from_options(options),
        );
        let routes = compose_routes(&self.plugins, &loop_handle, policy, host_keys);

        let application = build_application(routes, AppSettings::from_options(options)?, &self.plugins)?;

        let tls = runtime.block_on(get_ssl_context(options))?;
        let mut server_options = ServerOptions::from_options(options)?;

        let mut registry = ServerRegistry::new();
        let entered = runtime.enter();
        let started = start_listeners(
            &mut registry,
            application.as_ref(),
            options,
            &mut server_options,
            tls,
            &loop_handle,
        );
        drop(entered);

        if let Err(e) = started {
            // Tasks die with the runtime; the handles only need the signal.
            registry.shutdown_all(Duration::ZERO);
            return Err(e);
        }

        self.registry = registry;
        tracing::info!(listeners = self.registry.len(), "Gateway started");
        self.runtime = Some(runtime);
        self.loop_handle = Some(loop_handle);
        self.application = Some(application);
        Ok(())
    }

    /// Started listeners, in start order.
    pub fn servers(&self) -> &[ListenerHandle] {
        self.registry.servers()
    }

    pub fn options(&self) -> &GatewayOptions {
        &self.options
    }

    /// Loop-scoped state, once started.
    pub fn loop_handle(&self) -> Option<&LoopHandle> {
        self.loop_handle.as_ref()
    }

    /// Drive the event loop until `future` completes.
    pub fn run_until<F: Future>(&self, future: F) -> Result<F::Output> {
        let runtime = self.runtime.as_ref().ok_or_else(not_started)?;
        Ok(runtime.block_on(future))
    }

    /// Stop every listener and wait for its serving task.
    pub fn shutdown(&mut self) -> Result<()> {
        let runtime = self.runtime.as_ref().ok_or_else(not_started)?;
        let tasks = self.registry.shutdown_all(SHUTDOWN_GRACE);

        runtime.block_on(async {
            for task in tasks {
                match task.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::warn!(error = %e, "Listener stopped with an error"),
                    Err(e) => tracing::warn!(error = %e, "Listener task failed"),
                }
            }
        });

        tracing::info!("Shutdown complete");
        Ok(())
    }

    /// Step 9: serve until a shutdown signal arrives.
    pub fn serve_forever(mut self) -> Result<()> {
        self.run_until(shutdown_signal())?;
        self.shutdown()
    }
}

/// Steps 7 and 8. Must run inside the runtime context.
fn start_listeners(
    registry: &mut ServerRegistry,
    application: &dyn Application,
    options: &GatewayOptions,
    server_options: &mut ServerOptions,
    tls: Option<TlsContext>,
    loop_handle: &LoopHandle,
) -> Result<()> {
    registry.push(start_listener(
        application,
        options.port,
        &options.address,
        server_options,
        loop_handle.redirect(),
    )?);

    if let Some(tls) = tls {
        server_options.tls = Some(tls);
        registry.push(start_listener(
            application,
            options.sslport,
            &options.ssladdress,
            server_options,
            loop_handle.redirect(),
        )?);
    }
    Ok(())
}

fn not_started() -> GatewayError {
    GatewayError::Runtime("gateway not started".into())
}

/// Start a gateway and serve until shutdown.
pub fn run(options: GatewayOptions, plugins: Plugins) -> Result<()> {
    let mut gateway = Gateway::new(options, plugins);
    gateway.start()?;
    gateway.serve_forever()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_options() -> GatewayOptions {
        GatewayOptions {
            address: "127.0.0.1".into(),
            port: 0,
            hostfile: "/nonexistent/known_hosts".into(),
            syshostfile: "/nonexistent/known_hosts".into(),
            ..Default::default()
        }
    }

    #[test]
    fn invalid_encoding_starts_nothing() {
        let mut gateway = Gateway::new(
            GatewayOptions {
                encoding: "no-such-charset".into(),
                ..local_options()
            },
            Plugins::default(),
        );
        let err = gateway.start().unwrap_err();
        assert!(matches!(err, GatewayError::Encoding(_)));
        assert!(gateway.servers().is_empty());
        assert!(gateway.run_until(async {}).is_err());
    }

    #[test]
    fn plaintext_only_without_tls() {
        let mut gateway = Gateway::new(local_options(), Plugins::default());
        gateway.start().unwrap();
        assert_eq!(gateway.servers().len(), 1);
        assert_ne!(gateway.servers()[0].local_addr().port(), 0);
        assert!(gateway.start().is_err());
        gateway.shutdown().unwrap();
    }
}
