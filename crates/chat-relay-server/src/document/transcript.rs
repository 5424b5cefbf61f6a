use chrono::Local;
use handlebars::Handlebars;
use serde_json::json;

const TRANSCRIPT_TEMPLATE: &str = include_str!("../../templates/transcript.hbs");

/// Renders the printable transcript page for one Q&A exchange.
///
/// The question is HTML-escaped; the response is trusted markup straight
/// from the chat widget and embedded raw. The footer carries a generation
/// timestamp in local time.
pub struct TranscriptRenderer {
    registry: Handlebars<'static>,
}

impl TranscriptRenderer {
    pub fn new() -> Result<Self, handlebars::TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_template_string("transcript", TRANSCRIPT_TEMPLATE)?;
        Ok(Self { registry })
    }

    pub fn render(
        &self,
        question: &str,
        response_html: &str,
    ) -> Result<String, handlebars::RenderError> {
        let generated_at = Local::now().format("%B %d, %Y at %I:%M %p").to_string();
        self.registry.render(
            "transcript",
            &json!({
                "question": question,
                "response_html": response_html,
                "generated_at": generated_at,
            }),
        )
    }
}
