//! Per-session conversation memory.
//!
//! Provides the ordered turn log, the pinned context window computed before
//! every upstream call (first 2 turns + last 10), and a bounded thread-safe
//! store keyed by opaque session id.

mod log;
mod store;

pub use log::{Role, SessionLog, Turn, PINNED_TURNS, RECENT_TURNS, WINDOW_TURNS};
pub use store::SessionStore;
