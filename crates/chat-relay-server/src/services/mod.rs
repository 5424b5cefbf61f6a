pub mod answer_client;
pub mod chat_service;
pub mod feedback_service;
pub mod mail_service;

pub use answer_client::{AnswerClient, AnswerProvider, UpstreamError};
pub use chat_service::ChatService;
pub use feedback_service::{FeedbackError, FeedbackService};
pub use mail_service::{MailError, MailService, SendOutcome};
