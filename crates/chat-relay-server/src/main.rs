use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use chat_relay_server::app::build_router;
use chat_relay_server::config::Settings;
use chat_relay_server::document::TranscriptRenderer;
use chat_relay_server::handlers::UiAssets;
use chat_relay_server::services::{AnswerClient, ChatService, FeedbackService, MailService};
use chat_relay_server::session::SessionStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,chat_relay_server=debug".to_string()),
        )
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    info!("🚀 Starting chat relay server...");

    // Load configuration
    let settings = Settings::load()?;
    info!("✅ Configuration loaded");

    // Session store with idle reaper
    let store = Arc::new(SessionStore::new(
        settings.session.max_sessions,
        settings.session.idle_ttl(),
    ));
    spawn_session_reaper(store.clone(), settings.session.reap_interval());

    // Initialize services
    let answer_client = Arc::new(AnswerClient::new(settings.upstream.clone()));
    let chat_service = Arc::new(ChatService::new(store, answer_client));

    let feedback_service = Arc::new(FeedbackService::new(
        settings.feedback.clone(),
        &settings.upstream,
    ));

    let renderer = TranscriptRenderer::new()?;
    let mail_service = Arc::new(MailService::new(settings.smtp.clone(), renderer)?);
    if settings.smtp.is_configured() {
        info!("✅ SMTP transport configured for {}", settings.smtp.server);
    } else {
        info!("⚠️ SMTP credentials not set, transcript emails will be simulated");
    }

    let ui_assets = Arc::new(UiAssets::load(&settings.ui)?);
    info!("✅ UI assets loaded");

    // Build router
    let app = build_router(chat_service, feedback_service, mail_service, ui_assets);

    // Server address
    let addr = SocketAddr::from((
        settings.server.host.parse::<std::net::IpAddr>()?,
        settings.server.port,
    ));
    info!("🎯 Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn spawn_session_reaper(store: Arc<SessionStore>, interval: Duration) {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        // The first tick of a tokio interval fires immediately.
        tick.tick().await;
        loop {
            tick.tick().await;
            store.cleanup_idle();
        }
    });
}
