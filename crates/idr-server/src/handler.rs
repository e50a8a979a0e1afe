use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use idr_engine::{ContactView, IdentifyRequest};
use idr_store::ContactStore;

use crate::error::{ServerError, ServerResult};
use crate::router::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Body of a successful `POST /identify`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentifyResponse {
    pub contact: ContactView,
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "idr-server",
        "version": env!("CARGO_PKG_VERSION"),
        "store_backend": state.store().backend_name(),
    }))
}

/// Reconcile one email/phone pair.
///
/// The store is synchronous, so the call runs on the blocking pool.
pub async fn identify_handler(
    State(state): State<AppState>,
    Json(request): Json<IdentifyRequest>,
) -> ServerResult<Json<IdentifyResponse>> {
    debug!(?request, "identify");
    let contact = tokio::task::spawn_blocking(move || state.identify(&request))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;
    Ok(Json(IdentifyResponse { contact }))
}
