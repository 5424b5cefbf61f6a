mod settings;

pub use settings::{
    FeedbackConfig, ServerConfig, SessionConfig, Settings, SmtpConfig, UiConfig, UpstreamConfig,
};
