use crate::models::chat::*;
use crate::services::ChatService;
use axum::{extract::Extension, Json};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// One chat exchange. Upstream failures come back as in-band reply strings,
/// so this route answers 200 regardless of outcome.
pub async fn chat_handler(
    Extension(chat_service): Extension<Arc<ChatService>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatReply> {
    let start_time = Instant::now();
    info!(
        "Chat request: session={}, message_len={}",
        request.session_id,
        request.message.len()
    );

    let reply = chat_service
        .handle_message(&request.session_id, &request.message)
        .await;

    info!(
        "Chat request for session={} answered in {:?}",
        request.session_id,
        start_time.elapsed()
    );
    Json(ChatReply { reply })
}
