//! Server lifecycle: store preparation, binding, and graceful shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use logpost_core::MessageStore;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::routes::create_router;
use crate::state::AppState;

/// The logpost HTTP server over a message store.
#[derive(Debug)]
pub struct LogServer<S> {
    state: Arc<AppState<S>>,
}

impl<S> Clone for LogServer<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: MessageStore> LogServer<S> {
    /// Create a new server over `store` with the given configuration.
    pub fn new(store: S, config: ServerConfig) -> Self {
        Self {
            state: Arc::new(AppState::new(store, config)),
        }
    }

    /// Get the shared state for external access.
    pub fn state(&self) -> Arc<AppState<S>> {
        Arc::clone(&self.state)
    }

    /// Create the router without starting the server.
    pub fn router(&self) -> axum::Router {
        create_router(Arc::clone(&self.state))
    }

    /// Make sure the store's index and mapping exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be prepared.
    pub async fn prepare(&self) -> ServerResult<()> {
        self.state.service().store().ensure_schema().await?;
        Ok(())
    }

    /// Prepare the store, then serve on `addr` until `shutdown` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be prepared, binding fails, or
    /// the server stops abnormally.
    pub async fn serve_with_shutdown<F>(&self, addr: SocketAddr, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.prepare().await?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(addr, e))?;
        self.serve_listener(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes.
    ///
    /// Does not prepare the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the server stops abnormally.
    pub async fn serve_listener<F>(&self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        info!(addr = %addr, "logpost listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        info!("logpost shut down");
        Ok(())
    }
}
