use std::sync::Arc;
use tokio::sync::MutexGuard;
use tracing::{debug, info, warn};

use super::answer_client::{AnswerProvider, UpstreamError};
use crate::session::{SessionLog, SessionStore};

/// Orchestrates one chat exchange per call.
///
/// An exchange appends the user turn, relays the bounded context window
/// upstream, and commits the assistant turn only on success. Any failure
/// (HTTP error status, transport error, undecodable body) rolls the user
/// turn back so the log grows by exactly two turns or not at all. The
/// session mutex is held for the whole exchange, which serializes racing
/// requests on one session id.
pub struct ChatService {
    store: Arc<SessionStore>,
    provider: Arc<dyn AnswerProvider>,
}

impl ChatService {
    pub fn new(store: Arc<SessionStore>, provider: Arc<dyn AnswerProvider>) -> Self {
        Self { store, provider }
    }

    /// Run one exchange and produce the reply text shown to the user.
    ///
    /// Failures are reported in-band as reply strings; the transport result
    /// of this call is always a reply, never an error.
    pub async fn handle_message(&self, session_id: &str, message: &str) -> String {
        let session = self.store.session(session_id);
        let log = session.lock().await;

        let mut exchange = Exchange::begin(log, message);
        let window = exchange.window();
        debug!(
            "Session '{}': exchange started, sending {} of {} turn(s)",
            session_id,
            window.len(),
            exchange.log_len()
        );

        match self.provider.ask(&window).await {
            Ok(reply) => {
                exchange.commit(&reply);
                info!("Session '{}': exchange committed", session_id);
                reply
            }
            Err(err) => {
                warn!("Session '{}': exchange failed: {}", session_id, err);
                // Drop of `exchange` rolls the pending user turn back.
                error_reply(&err)
            }
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }
}

/// In-band reply shown for a failed exchange. Rendered as Markdown by the
/// chat widget, hence the bold prefixes.
fn error_reply(err: &UpstreamError) -> String {
    match err {
        UpstreamError::Status(code) => format!("**Error {}:** Unable to fetch data.", code),
        UpstreamError::Transport(e) => format!("**Connection Error:** {}", e),
        UpstreamError::Unexpected(msg) => format!("**System Error:** {}", msg),
    }
}

/// One in-flight exchange on a locked session log.
///
/// Holds the session mutex from begin to commit. Until `commit` runs, drop
/// rolls the pending user turn back; that single path covers upstream
/// failures, panics, and callers cancelled mid-await.
struct Exchange<'a> {
    log: MutexGuard<'a, SessionLog>,
    committed: bool,
}

impl<'a> Exchange<'a> {
    fn begin(mut log: MutexGuard<'a, SessionLog>, message: &str) -> Self {
        log.push_user(message);
        Self {
            log,
            committed: false,
        }
    }

    fn window(&self) -> Vec<crate::session::Turn> {
        self.log.context_window()
    }

    fn log_len(&self) -> usize {
        self.log.len()
    }

    fn commit(&mut self, reply: &str) {
        self.log.push_assistant(reply);
        self.committed = true;
    }
}

impl Drop for Exchange<'_> {
    fn drop(&mut self) {
        if !self.committed {
            if self.log.rollback_last().is_some() {
                debug!("Rolled back pending user turn");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Role, Turn, WINDOW_TURNS};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted provider: pops one prepared result per call and records the
    /// window each call received.
    struct StubProvider {
        script: Mutex<VecDeque<Result<String, UpstreamError>>>,
        windows: Mutex<Vec<Vec<Turn>>>,
    }

    impl StubProvider {
        fn scripted(script: Vec<Result<String, UpstreamError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                windows: Mutex::new(Vec::new()),
            })
        }

        fn windows(&self) -> Vec<Vec<Turn>> {
            self.windows.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl AnswerProvider for StubProvider {
        async fn ask(&self, window: &[Turn]) -> Result<String, UpstreamError> {
            self.windows.lock().unwrap().push(window.to_vec());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("stub script exhausted")
        }
    }

    /// Provider that never answers, for cancellation tests.
    struct StalledProvider;

    #[async_trait::async_trait]
    impl AnswerProvider for StalledProvider {
        async fn ask(&self, _window: &[Turn]) -> Result<String, UpstreamError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok("never".to_string())
        }
    }

    fn service(provider: Arc<dyn AnswerProvider>) -> ChatService {
        let store = Arc::new(SessionStore::new(64, Duration::from_secs(3600)));
        ChatService::new(store, provider)
    }

    #[tokio::test]
    async fn successful_exchange_commits_both_turns() {
        let provider = StubProvider::scripted(vec![Ok("the answer".to_string())]);
        let service = service(provider);

        let reply = service.handle_message("s1", "what is part 7?").await;
        assert_eq!(reply, "the answer");

        let session = service.store().get("s1").expect("session exists");
        let log = session.lock().await;
        assert_eq!(log.len(), 2);
        assert_eq!(log.turns()[0], Turn::user("what is part 7?"));
        assert_eq!(log.turns()[1], Turn::assistant("the answer"));
    }

    #[tokio::test]
    async fn failed_exchange_leaves_log_unchanged() {
        let provider = StubProvider::scripted(vec![Err(UpstreamError::Status(500))]);
        let service = service(provider);

        let reply = service.handle_message("s1", "hello").await;
        assert_eq!(reply, "**Error 500:** Unable to fetch data.");

        let session = service.store().get("s1").expect("session exists");
        assert!(session.lock().await.is_empty());
    }

    #[tokio::test]
    async fn unexpected_body_reports_system_error() {
        let provider = StubProvider::scripted(vec![Err(UpstreamError::Unexpected(
            "invalid upstream response body: eof".to_string(),
        ))]);
        let service = service(provider);

        let reply = service.handle_message("s1", "hello").await;
        assert_eq!(
            reply,
            "**System Error:** invalid upstream response body: eof"
        );
        assert!(service.store().get("s1").unwrap().lock().await.is_empty());
    }

    #[tokio::test]
    async fn three_exchanges_grow_log_to_six_turns() {
        let provider = StubProvider::scripted(vec![
            Ok("a1".to_string()),
            Ok("a2".to_string()),
            Ok("a3".to_string()),
        ]);
        let service = service(provider);

        for question in ["q1", "q2", "q3"] {
            service.handle_message("s1", question).await;
        }

        let session = service.store().get("s1").unwrap();
        let log = session.lock().await;
        assert_eq!(log.len(), 6);
        let roles: Vec<Role> = log.turns().iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
            ]
        );
    }

    #[tokio::test]
    async fn long_logs_send_a_capped_window_ending_in_the_new_turn() {
        let provider = StubProvider::scripted(vec![Ok("a".to_string())]);
        let service = service(provider.clone());

        {
            let session = service.store().session("s1");
            let mut log = session.lock().await;
            for i in 0..7 {
                log.push_user(format!("q{}", i));
                log.push_assistant(format!("a{}", i));
            }
        }

        service.handle_message("s1", "newest question").await;

        let windows = provider.windows();
        assert_eq!(windows.len(), 1);
        let window = &windows[0];

        // 14 stored turns plus the pending one, windowed down to 12.
        assert_eq!(window.len(), WINDOW_TURNS);
        assert_eq!(window[0], Turn::user("q0"));
        assert_eq!(window[1], Turn::assistant("a0"));
        assert_eq!(window[WINDOW_TURNS - 1], Turn::user("newest question"));

        let session = service.store().get("s1").unwrap();
        assert_eq!(session.lock().await.len(), 16);
    }

    #[tokio::test]
    async fn short_logs_send_everything() {
        let provider = StubProvider::scripted(vec![Ok("a1".to_string()), Ok("a2".to_string())]);
        let service = service(provider.clone());

        service.handle_message("s1", "q1").await;
        service.handle_message("s1", "q2").await;

        let windows = provider.windows();
        assert_eq!(windows[0].len(), 1);
        assert_eq!(windows[1].len(), 3);
        assert_eq!(windows[1][2], Turn::user("q2"));
    }

    #[tokio::test]
    async fn cancelled_exchange_rolls_back_and_releases_the_session() {
        let service = service(Arc::new(StalledProvider));

        let result = tokio::time::timeout(
            Duration::from_millis(50),
            service.handle_message("s1", "doomed"),
        )
        .await;
        assert!(result.is_err(), "exchange should have been cancelled");

        // Dropping the exchange future must both roll back the pending turn
        // and release the session mutex.
        let session = service.store().get("s1").expect("session exists");
        let log = session.lock().await;
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn failure_then_success_recovers_cleanly() {
        let provider = StubProvider::scripted(vec![
            Err(UpstreamError::Status(503)),
            Ok("recovered".to_string()),
        ]);
        let service = service(provider.clone());

        let first = service.handle_message("s1", "try one").await;
        assert_eq!(first, "**Error 503:** Unable to fetch data.");

        let second = service.handle_message("s1", "try two").await;
        assert_eq!(second, "recovered");

        let session = service.store().get("s1").unwrap();
        let log = session.lock().await;
        assert_eq!(log.len(), 2);
        assert_eq!(log.turns()[0], Turn::user("try two"));

        // The failed attempt's window still contained its pending turn.
        let windows = provider.windows();
        assert_eq!(windows[0], vec![Turn::user("try one")]);
        assert_eq!(windows[1], vec![Turn::user("try two")]);
    }
}
