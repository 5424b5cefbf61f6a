use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Service configuration, layered as `config/settings.toml` (optional)
/// under `APP__`-prefixed environment variables, with built-in defaults so
/// the relay also runs bare (proof-of-concept style, credentials via env).
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub session: SessionConfig,
    pub feedback: FeedbackConfig,
    pub smtp: SmtpConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// The external question-answering API the chat route relays to.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct UpstreamConfig {
    pub url: String,
    pub username: String,
    pub password: String,
    /// Long fixed timeout; the upstream is expected to be slow.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: "https://integrate.example.com/ws/simple/createGetAIData".to_string(),
            username: "chatbot-poc".to_string(),
            password: "changeme".to_string(),
            timeout_secs: 300,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    /// Hard cap on concurrently stored sessions; the idlest session is
    /// evicted when a new id arrives at capacity.
    pub max_sessions: usize,
    pub idle_ttl_secs: u64,
    pub reap_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_sessions: 10_000,
            idle_ttl_secs: 6 * 60 * 60,
            reap_interval_secs: 300,
        }
    }
}

impl SessionConfig {
    pub fn idle_ttl(&self) -> Duration {
        Duration::from_secs(self.idle_ttl_secs)
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Local JSON array file, the source of truth for submitted feedback.
    pub file_path: String,
    /// Remote endpoint mirrored best-effort; shares upstream credentials.
    pub mirror_url: String,
    pub mirror_timeout_secs: u64,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            file_path: "user_feedback.json".to_string(),
            mirror_url: "https://integrate.example.com/ws/simple/executeUserFeedback".to_string(),
            mirror_timeout_secs: 10,
        }
    }
}

impl FeedbackConfig {
    pub fn mirror_timeout(&self) -> Duration {
        Duration::from_secs(self.mirror_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// When credentials are unset, pretend the send succeeded instead of
    /// failing. Kept as an explicit flag so the proof-of-concept fallback
    /// can be switched off in real deployments.
    pub simulate_unconfigured: bool,
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            server: "smtp.gmail.com".to_string(),
            port: 587,
            username: "relay-bot@example.com".to_string(),
            password: String::new(),
            simulate_unconfigured: true,
        }
    }
}

impl SmtpConfig {
    /// Credentials count as configured once a real password is set.
    pub fn is_configured(&self) -> bool {
        !self.password.is_empty() && self.password != "your_app_password"
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct UiConfig {
    pub templates_dir: String,
    pub static_dir: String,
    /// Exact-name allow-list for `/static/{filename}`.
    pub static_allow_list: Vec<String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            templates_dir: "templates".to_string(),
            static_dir: "static".to_string(),
            static_allow_list: vec![
                "logo.png".to_string(),
                "logo_title.png".to_string(),
                "bot.png".to_string(),
                "bot_thinking.png".to_string(),
            ],
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/settings").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn defaults_are_complete() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8000);
        assert_eq!(settings.upstream.timeout(), Duration::from_secs(300));
        assert_eq!(settings.feedback.mirror_timeout(), Duration::from_secs(10));
        assert_eq!(settings.ui.static_allow_list.len(), 4);
        assert!(!settings.smtp.is_configured());
    }

    #[test]
    fn partial_file_falls_back_per_field() {
        let config = Config::builder()
            .add_source(File::from_str("[server]\nport = 9000", FileFormat::Toml))
            .build()
            .unwrap();
        let settings: Settings = config.try_deserialize().unwrap();

        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.session.max_sessions, 10_000);
    }

    #[test]
    fn sentinel_password_counts_as_unconfigured() {
        let smtp = SmtpConfig {
            password: "your_app_password".to_string(),
            ..SmtpConfig::default()
        };
        assert!(!smtp.is_configured());

        let smtp = SmtpConfig {
            password: "real-app-password".to_string(),
            ..SmtpConfig::default()
        };
        assert!(smtp.is_configured());
    }
}
