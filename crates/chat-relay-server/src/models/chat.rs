use serde::{Deserialize, Serialize};

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_session_id() -> String {
    "default_guest".to_string()
}

/// Feedback payload. `rating` stays a plain string ("positive"/"negative");
/// only field presence is validated, matching the relay's contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub question: String,
    pub response: String,
    pub rating: String,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
    pub question: String,
    pub response_html: String,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Serialize)]
pub struct FeedbackAck {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct EmailResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
