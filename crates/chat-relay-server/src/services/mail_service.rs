use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{error, info};

use crate::config::SmtpConfig;
use crate::document::{html_to_pdf, DocumentError, TranscriptRenderer};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("transcript rendering failed: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("document generation failed: {0}")]
    Document(#[from] DocumentError),

    #[error("message composition failed: {0}")]
    Compose(String),

    #[error("smtp transport failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

impl MailError {
    /// Callers report generation failures and transport failures with
    /// different messages; composition and SMTP problems both count as
    /// transport here.
    pub fn is_generation(&self) -> bool {
        matches!(self, MailError::Render(_) | MailError::Document(_))
    }
}

/// How a transcript left the building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    Simulated,
}

const MAIL_BODY: &str = "Hello,\n\n\
    Thank you for using the chat assistant. The attached PDF contains the \
    answer to your question, including any tables and part details from the \
    conversation.\n\n\
    If you need further help, just ask in the chat.\n\n\
    Best regards,\nThe Support Team\n";

/// Emails a PDF transcript of one Q&A exchange.
///
/// The pipeline renders the transcript template, composes the PDF, and
/// relays it over authenticated STARTTLS. Without real credentials the send
/// is simulated and reported as success, so the flow can be demonstrated
/// before an SMTP account exists.
pub struct MailService {
    config: SmtpConfig,
    renderer: TranscriptRenderer,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl MailService {
    pub fn new(config: SmtpConfig, renderer: TranscriptRenderer) -> Result<Self, MailError> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            config,
            renderer,
            transport,
        })
    }

    pub async fn send_transcript(
        &self,
        to: &str,
        question: &str,
        response_html: &str,
    ) -> Result<SendOutcome, MailError> {
        let html = self.renderer.render(question, response_html)?;
        let pdf = html_to_pdf(&html)?;

        if !self.config.is_configured() && self.config.simulate_unconfigured {
            info!("SIMULATED EMAIL to {} (Size: {} bytes)", to, pdf.len());
            return Ok(SendOutcome::Simulated);
        }

        let message = self.compose(to, pdf)?;
        match self.transport.send(message).await {
            Ok(_) => {
                info!("Transcript emailed to {}", to);
                Ok(SendOutcome::Sent)
            }
            Err(e) => {
                error!("SMTP send to {} failed: {}", to, e);
                Err(e.into())
            }
        }
    }

    fn compose(&self, to: &str, pdf: Vec<u8>) -> Result<Message, MailError> {
        let from: Mailbox = self
            .config
            .username
            .parse()
            .map_err(|e| MailError::Compose(format!("invalid sender address: {}", e)))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| MailError::Compose(format!("invalid recipient address: {}", e)))?;

        let pdf_type = ContentType::parse("application/pdf")
            .map_err(|e| MailError::Compose(format!("invalid attachment type: {}", e)))?;
        let attachment = Attachment::new("chat_response.pdf".to_string()).body(pdf, pdf_type);

        Message::builder()
            .from(from)
            .to(to)
            .subject("Your Chat Response")
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(MAIL_BODY.to_string()))
                    .singlepart(attachment),
            )
            .map_err(|e| MailError::Compose(e.to_string()))
    }
}
