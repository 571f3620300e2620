//! Dialogue Session Store
//!
//! Per-user conversational state with opportunistic idle eviction. Each
//! session sits behind its own mutex so a turn holds exactly one user's
//! state for its duration; the outer map is only locked to resolve or
//! remove entries.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// Sessions idle longer than this are eligible for eviction.
const SESSION_TTL_SECS: i64 = 3600;

/// Eviction only runs once the store grows past this many sessions.
const SWEEP_THRESHOLD: usize = 100;

/// Mutable per-user dialogue state. `payment_mode` marks an in-progress
/// payment flow; the two optional fields encode its position.
#[derive(Debug, Clone)]
pub struct Session {
    pub payment_mode: bool,
    pub current_payee: Option<String>,
    pub current_amount: Option<f64>,
    pub last_active: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        Self {
            payment_mode: false,
            current_payee: None,
            current_amount: None,
            last_active: Utc::now(),
        }
    }

    /// Mark real activity on this session.
    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Leave the payment flow, clearing all collected fields.
    pub fn reset_payment(&mut self) {
        self.payment_mode = false;
        self.current_payee = None;
        self.current_amount = None;
    }
}

pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve the session for a user id, creating it on first contact.
    pub async fn get_or_create(&self, user_id: &str) -> Arc<Mutex<Session>> {
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(user_id) {
                return session.clone();
            }
        }

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Session::new())))
            .clone()
    }

    /// Destroy a session (explicit farewell).
    pub async fn remove(&self, user_id: &str) {
        self.sessions.write().await.remove(user_id);
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Opportunistic eviction: only when the store has grown past the
    /// threshold, drop every session idle longer than the TTL. Sessions
    /// currently locked by a turn are active by definition and skipped.
    pub async fn sweep_if_crowded(&self) {
        {
            let sessions = self.sessions.read().await;
            if sessions.len() <= SWEEP_THRESHOLD {
                return;
            }
        }

        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|_, session| match session.try_lock() {
            Ok(guard) => (now - guard.last_active).num_seconds() <= SESSION_TTL_SECS,
            Err(_) => true,
        });

        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {} idle sessions", evicted);
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
