use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{delete, get},
};
use tracing::info;

use crate::{AppState, auth, error::ApiError, storage::FeedbackRecord};

use super::types::{CreateFeedbackRequest, FeedbackListResponse, MessageResponse};

pub fn feedback_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/feedback", get(list_feedback).post(create_feedback))
        .route("/feedback/{feedback_id}", delete(delete_feedback))
}

async fn create_feedback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateFeedbackRequest>,
) -> Result<Json<FeedbackRecord>, ApiError> {
    let user = auth::current_user(&state, &headers).await?;

    let record = state
        .feedback
        .create(&request.message, user.id)
        .await
        .map_err(ApiError::Internal)?;

    info!(feedback_id = record.id, user_id = user.id, "feedback recorded");
    Ok(Json(record))
}

/// Admin review: every feedback record plus sentiment computed fresh on
/// each call.
async fn list_feedback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<FeedbackListResponse>, ApiError> {
    let user = auth::current_user(&state, &headers).await?;
    auth::require_admin(&user, "view feedback")?;

    let feedback = state
        .feedback
        .list_newest_first()
        .await
        .map_err(ApiError::Internal)?;

    let sentiment_analysis = state.sentiment.analyze_batch(&feedback);

    Ok(Json(FeedbackListResponse {
        feedback,
        sentiment_analysis,
    }))
}

async fn delete_feedback(
    State(state): State<Arc<AppState>>,
    Path(feedback_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    let user = auth::current_user(&state, &headers).await?;
    auth::require_admin(&user, "delete feedback")?;

    let removed = state
        .feedback
        .delete(feedback_id)
        .await
        .map_err(ApiError::Internal)?;
    if !removed {
        return Err(ApiError::NotFound("Feedback not found".to_string()));
    }

    info!(feedback_id, "feedback deleted");
    Ok(Json(MessageResponse {
        message: "Feedback deleted successfully".to_string(),
    }))
}
