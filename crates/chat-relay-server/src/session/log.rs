use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Number of turns pinned from the start of the log.
pub const PINNED_TURNS: usize = 2;

/// Number of most recent turns kept behind the pinned block.
pub const RECENT_TURNS: usize = 10;

/// Maximum number of turns ever sent upstream per exchange.
pub const WINDOW_TURNS: usize = PINNED_TURNS + RECENT_TURNS;

/// Speaker of a turn. Serialized lowercase on the upstream wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation. Immutable once appended to a log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered per-session turn log.
///
/// The log itself only ever grows by appends and shrinks by rollback of the
/// last turn; the windowing step works on a copy and never truncates it.
#[derive(Debug, Clone)]
pub struct SessionLog {
    turns: Vec<Turn>,

    /// Creation time, kept for monitoring.
    created_at: Instant,

    /// Last append/rollback, drives idle eviction.
    last_activity: Instant,
}

impl SessionLog {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            turns: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Append a user turn. Content may be empty; no validation is performed.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::user(content));
        self.touch();
    }

    /// Append an assistant turn. Called only after a successful upstream
    /// response has been parsed.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::assistant(content));
        self.touch();
    }

    /// Remove the most recently appended turn, returning it.
    ///
    /// Invoked when an exchange fails after its user turn was appended, so
    /// the next window is computed as though the attempt never happened.
    pub fn rollback_last(&mut self) -> Option<Turn> {
        let turn = self.turns.pop();
        self.touch();
        turn
    }

    /// Compute the bounded context window sent upstream.
    ///
    /// Logs of up to [`WINDOW_TURNS`] turns are returned whole. Longer logs
    /// keep the first [`PINNED_TURNS`] turns (the anchoring context, e.g. a
    /// model number stated early on) followed by the last [`RECENT_TURNS`]
    /// turns. For lengths above the limit the two slices are disjoint by
    /// construction, so no turn is duplicated and relative order holds.
    pub fn context_window(&self) -> Vec<Turn> {
        if self.turns.len() <= WINDOW_TURNS {
            return self.turns.clone();
        }

        let mut window = Vec::with_capacity(WINDOW_TURNS);
        window.extend_from_slice(&self.turns[..PINNED_TURNS]);
        window.extend_from_slice(&self.turns[self.turns.len() - RECENT_TURNS..]);
        window
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// True once the log has seen no activity for `ttl`.
    pub fn is_idle(&self, ttl: Duration) -> bool {
        self.last_activity.elapsed() > ttl
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    fn touch(&mut self) {
        self.last_activity = Instant::now();
    }
}

impl Default for SessionLog {
    fn default() -> Self {
        Self::new()
    }
}
