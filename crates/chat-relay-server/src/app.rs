use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers::{self, UiAssets};
use crate::services::{ChatService, FeedbackService, MailService};

pub fn build_router(
    chat_service: Arc<ChatService>,
    feedback_service: Arc<FeedbackService>,
    mail_service: Arc<MailService>,
    ui_assets: Arc<UiAssets>,
) -> Router {
    Router::new()
        .route("/", get(handlers::ui::index_handler))
        .route("/static/{filename}", get(handlers::ui::static_handler))
        .route("/chat", post(handlers::chat::chat_handler))
        .route("/feedback", post(handlers::feedback::feedback_handler))
        .route("/send-email", post(handlers::email::send_email_handler))
        .route("/health", get(handlers::health::health_check))
        // Shared state
        .layer(Extension(chat_service))
        .layer(Extension(feedback_service))
        .layer(Extension(mail_service))
        .layer(Extension(ui_assets))
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(false)),
        )
        // Body limit (response_html payloads can be sizeable)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
}
