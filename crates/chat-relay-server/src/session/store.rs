use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::log::SessionLog;

/// Thread-safe in-memory session store.
///
/// Each log sits behind its own async mutex; an exchange holds that mutex
/// from the user-turn append until commit or rollback, so two concurrent
/// exchanges on one session can never interleave their mutations. The store
/// is bounded: a capacity cap evicts the idlest session and a reaper task
/// periodically drops sessions past the idle TTL. Sessions whose mutex is
/// held (an exchange in flight) are never evicted.
pub struct SessionStore {
    sessions: DashMap<String, Arc<Mutex<SessionLog>>>,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(max_sessions: usize, idle_ttl: Duration) -> Self {
        info!(
            "Initializing session store (max_sessions={}, idle_ttl={}s)",
            max_sessions,
            idle_ttl.as_secs()
        );
        Self {
            sessions: DashMap::new(),
            max_sessions,
            idle_ttl,
        }
    }

    /// Get the log for `session_id`, creating an empty one for unseen ids.
    pub fn session(&self, session_id: &str) -> Arc<Mutex<SessionLog>> {
        if let Some(entry) = self.sessions.get(session_id) {
            return entry.value().clone();
        }

        if self.sessions.len() >= self.max_sessions {
            self.evict_idlest();
        }

        debug!("Creating session log for '{}'", session_id);
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionLog::new())))
            .value()
            .clone()
    }

    /// Look up a session without creating it.
    pub fn get(&self, session_id: &str) -> Option<Arc<Mutex<SessionLog>>> {
        self.sessions.get(session_id).map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle past the TTL. Returns how many were removed.
    pub fn cleanup_idle(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, log| match log.try_lock() {
            Ok(guard) => !guard.is_idle(self.idle_ttl),
            // Locked means an exchange is in flight; keep it.
            Err(_) => true,
        });
        let removed = before.saturating_sub(self.sessions.len());

        if removed > 0 {
            info!("Reaped {} idle session(s)", removed);
        }
        removed
    }

    /// Remove the session with the oldest activity among those not currently
    /// locked. Called when the store is at capacity and a new id arrives.
    fn evict_idlest(&self) {
        let mut idlest: Option<(String, Instant)> = None;

        for entry in self.sessions.iter() {
            if let Ok(log) = entry.value().try_lock() {
                let activity = log.last_activity();
                let older = idlest
                    .as_ref()
                    .map(|(_, best)| activity < *best)
                    .unwrap_or(true);
                if older {
                    idlest = Some((entry.key().clone(), activity));
                }
            }
        }

        match idlest {
            Some((key, _)) => {
                warn!(
                    "Session store at capacity ({}), evicting idlest session '{}'",
                    self.max_sessions, key
                );
                self.sessions.remove(&key);
            }
            None => {
                warn!(
                    "Session store at capacity ({}) but every session is in flight; \
                     allowing temporary overflow",
                    self.max_sessions
                );
            }
        }
    }
}
