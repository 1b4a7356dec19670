//! Handle on the event loop and the state scoped to it.

use std::future::Future;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::HandlerOptions;
use crate::http::session::SessionStore;
use crate::net::HttpsRedirect;

/// The event loop the gateway runs on, plus the state its built-in handlers
/// share: pending sessions, the HTTPS redirect target and handler options.
///
/// Cheap to clone.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    runtime: Handle,
    sessions: SessionStore,
    redirect: HttpsRedirect,
    options: Arc<HandlerOptions>,
}

impl LoopHandle {
    pub fn new(runtime: Handle, options: HandlerOptions) -> Self {
        Self {
            runtime,
            sessions: SessionStore::new(),
            redirect: HttpsRedirect::new(),
            options: Arc::new(options),
        }
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn redirect(&self) -> &HttpsRedirect {
        &self.redirect
    }

    pub fn options(&self) -> &HandlerOptions {
        &self.options
    }

    /// Run `future` as a task on the event loop.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }
}
