use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use crate::core::errors::ApiError;
use crate::state::AppState;

/// Process liveness; never touches the model backend.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "pending_jobs": state.queue.pending(),
    }))
}

/// Backend reachability through the model gateway.
pub async fn backend_health(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();
    let report = state.engine.check_health(&cancel).await?;
    Ok(Json(report))
}
