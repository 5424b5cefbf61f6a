//! Transcript document pipeline: template rendering and PDF composition.

pub mod pdf;
pub mod transcript;

pub use pdf::{html_to_pdf, DocumentError};
pub use transcript::TranscriptRenderer;
