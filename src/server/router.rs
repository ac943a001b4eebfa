use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{health, localai};
use crate::state::AppState;

/// Creates the application router.
///
/// - `/health`: process liveness
/// - `/localai/*`: chat, knowledge base, feedback and training endpoints
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/localai", localai_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn localai_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", post(localai::chat))
        .route("/ingest", post(localai::ingest))
        .route("/search", post(localai::search))
        .route("/feedback", post(localai::feedback))
        .route("/train/start", post(localai::start_training))
        .route("/train/status", get(localai::training_status))
        .route("/stats", get(localai::stats))
        .route("/health", get(health::backend_health))
        .route("/document/delete", post(localai::delete_document))
}
