use crate::models::chat::*;
use crate::services::FeedbackService;
use crate::utils::error::ApiError;
use axum::{extract::Extension, Json};
use std::sync::Arc;

/// Persist one feedback entry. Only local persistence can fail this route;
/// the remote mirror is detached and best-effort.
pub async fn feedback_handler(
    Extension(feedback_service): Extension<Arc<FeedbackService>>,
    Json(request): Json<FeedbackRequest>,
) -> Result<Json<FeedbackAck>, ApiError> {
    feedback_service
        .record(request)
        .await
        .map_err(|e| ApiError::FeedbackStorage(e.to_string()))?;

    Ok(Json(FeedbackAck {
        message: "Feedback saved successfully".to_string(),
    }))
}
