//! Connection lifecycle hooks.
//!
//! # Hooks
//! - Start updater: async, runs before the transport connects and returns
//!   [`ConnectionOverrides`] for the request's arguments
//! - Error handler: a scope entered before a connection request is handled
//!   and exited with its outcome, success or failure
//!
//! # Design Decisions
//! - Hooks are plain function values; no trait to implement for the common case
//! - Exit receives the outcome by value so a scope can pass it through or
//!   translate one error into another

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use uuid::Uuid;

use crate::error::Result;
use crate::plugins::{ConnectionOverrides, RequestContext};

/// Async hook producing argument overrides for one connection request.
pub type ConnStartUpdater =
    Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Result<ConnectionOverrides>> + Send + Sync>;

/// Factory entering an [`ErrorScope`] for one connection request.
pub type ConnErrorHandler = Arc<dyn Fn(&RequestContext) -> Box<dyn ErrorScope> + Send + Sync>;

/// Outcome of handling one connection request: the new session id.
pub type ConnectOutcome = Result<Uuid>;

/// A scope wrapped around the handling of one connection request.
///
/// The scope is entered when its factory returns it. `exit` is always called
/// exactly once, after handling finished. It may observe the outcome or map
/// an error to a different error; a session id is only ever produced by a
/// successful handling, so a scope cannot turn a failure into a success.
pub trait ErrorScope: Send {
    fn exit(self: Box<Self>, outcome: ConnectOutcome) -> ConnectOutcome;
}

/// The default scope: does nothing on enter or exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThrough;

impl ErrorScope for PassThrough {
    fn exit(self: Box<Self>, outcome: ConnectOutcome) -> ConnectOutcome {
        outcome
    }
}

/// Error handler used when the operator supplies none.
pub fn default_error_handler() -> ConnErrorHandler {
    Arc::new(|_request: &RequestContext| Box::new(PassThrough) as Box<dyn ErrorScope>)
}

/// Box an async closure into a [`ConnStartUpdater`].
pub fn conn_start_updater<F, Fut>(f: F) -> ConnStartUpdater
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ConnectionOverrides>> + Send + 'static,
{
    Arc::new(
        move |request: RequestContext| -> BoxFuture<'static, Result<ConnectionOverrides>> {
            Box::pin(f(request))
        },
    )
}

/// Run `handling` inside the scope produced by `handler` for `request`.
pub async fn run_in_scope<F>(
    handler: &ConnErrorHandler,
    request: &RequestContext,
    handling: F,
) -> ConnectOutcome
where
    F: Future<Output = ConnectOutcome>,
{
    let scope = handler(request);
    let outcome = handling.await;
    scope.exit(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::plugins::args::test_context;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Translate {
        exits: Arc<AtomicUsize>,
    }

    impl ErrorScope for Translate {
        fn exit(self: Box<Self>, outcome: ConnectOutcome) -> ConnectOutcome {
            self.exits.fetch_add(1, Ordering::SeqCst);
            outcome.map_err(|e| GatewayError::Forbidden(format!("denied: {e}")))
        }
    }

    #[tokio::test]
    async fn default_scope_passes_errors_through() {
        let request = test_context(&[]);
        let outcome = run_in_scope(&default_error_handler(), &request, async {
            Err(GatewayError::Extension("boom".into()))
        })
        .await;
        assert!(matches!(outcome, Err(GatewayError::Extension(msg)) if msg == "boom"));
    }

    #[tokio::test]
    async fn scope_exits_on_success_and_failure() {
        let exits = Arc::new(AtomicUsize::new(0));
        let counter = exits.clone();
        let handler: ConnErrorHandler = Arc::new(move |_: &RequestContext| {
            Box::new(Translate {
                exits: counter.clone(),
            }) as Box<dyn ErrorScope>
        });
        let request = test_context(&[]);

        let ok = run_in_scope(&handler, &request, async { Ok(Uuid::nil()) }).await;
        assert_eq!(ok.unwrap(), Uuid::nil());

        let err = run_in_scope(&handler, &request, async {
            Err(GatewayError::InvalidRequest("no hostname".into()))
        })
        .await;
        assert_eq!(err.unwrap_err().to_string(), "denied: no hostname");
        assert_eq!(exits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn boxed_updater_sees_the_request() {
        let updater = conn_start_updater(|request: RequestContext| async move {
            Ok(ConnectionOverrides {
                username: request.argument("user").map(str::to_string),
                ..Default::default()
            })
        });
        let overrides = updater(test_context(&[("user", "deploy")])).await.unwrap();
        assert_eq!(overrides.username.as_deref(), Some("deploy"));
    }
}
