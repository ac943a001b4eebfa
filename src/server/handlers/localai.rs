use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use tokio_util::sync::CancellationToken;

use crate::core::errors::ApiError;
use crate::rag::dto::{
    DeleteDocumentRequest, FeedbackRequest, IngestRequest, RagChatRequest, SearchRequest,
    TrainRequest,
};
use crate::state::AppState;

pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RagChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    // Dropped with the handler when the client goes away.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let response = state.engine.chat(payload, &cancel).await?;
    Ok(Json(response))
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<IngestRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    Ok(Json(state.engine.ingest(payload)?))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    Ok(Json(state.engine.search(payload)?))
}

pub async fn feedback(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    Ok(Json(state.engine.submit_feedback(payload)?))
}

pub async fn start_training(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TrainRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    Ok(Json(state.engine.start_training(payload)?))
}

pub async fn training_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.training_status())
}

pub async fn stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.engine.stats())
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteDocumentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    Ok(Json(state.engine.delete_document(payload)?))
}
