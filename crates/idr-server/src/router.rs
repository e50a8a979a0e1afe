use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use idr_engine::Reconciler;

use crate::backend::ContactBackend;
use crate::handler;

/// Shared handler state.
pub type AppState = Arc<Reconciler<ContactBackend>>;

/// Build the axum router with every endpoint.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/identify", post(handler::identify_handler))
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
