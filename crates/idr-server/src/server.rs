use std::sync::Arc;

use tokio::net::TcpListener;

use idr_engine::Reconciler;
use idr_store::ContactStore;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::{build_router, AppState};

/// Identity reconciliation server.
pub struct IdrServer {
    config: ServerConfig,
    state: AppState,
}

impl IdrServer {
    /// Open the configured store and prepare the server.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let backend = config.store.open()?;
        Ok(Self {
            config,
            state: Arc::new(Reconciler::new(backend)),
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            store = self.state.store().backend_name(),
            "idr server listening on {}",
            self.config.bind_addr
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
