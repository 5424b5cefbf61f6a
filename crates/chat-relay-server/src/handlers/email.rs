use crate::models::chat::*;
use crate::services::MailService;
use axum::{extract::Extension, Json};
use std::sync::Arc;
use tracing::{error, info};

/// Generate a PDF transcript of one exchange and email it.
///
/// Failures are reported through the `success` flag with a message that
/// distinguishes generation from delivery problems; the route itself
/// answers 200 either way.
pub async fn send_email_handler(
    Extension(mail_service): Extension<Arc<MailService>>,
    Json(request): Json<EmailRequest>,
) -> Json<EmailResponse> {
    info!("Transcript email requested for {}", request.email);

    match mail_service
        .send_transcript(&request.email, &request.question, &request.response_html)
        .await
    {
        Ok(_) => Json(EmailResponse {
            success: true,
            message: None,
        }),
        Err(e) if e.is_generation() => {
            error!("Transcript generation failed: {}", e);
            Json(EmailResponse {
                success: false,
                message: Some("PDF Generation Failed".to_string()),
            })
        }
        Err(e) => {
            error!("Transcript delivery failed: {}", e);
            Json(EmailResponse {
                success: false,
                message: Some("Failed to send email (SMTP Error)".to_string()),
            })
        }
    }
}
