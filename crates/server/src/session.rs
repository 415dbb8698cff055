//! Session management
//!
//! Each session represents one client: a fresh id handed out at
//! InitSession, whether its PIR evaluation keys have been installed, and
//! expiration tracking. Sessions own no per-client PIR state beyond the
//! keys — the table databases are shared and read-only after build.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::time::Duration;
use uuid::Uuid;

use crate::error::{Result, ServerError};

/// Session state
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session ID
    pub id: Uuid,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,

    /// Whether the client's evaluation keys have been installed
    pub keys_ready: bool,

    /// The PIR client id the keys were installed under
    pub pir_client_id: Option<u64>,
}

impl Session {
    fn new(ttl: Duration) -> Self {
        let now = Utc::now();
        let expires_at =
            now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(900));
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            expires_at,
            keys_ready: false,
            pir_client_id: None,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Extend the session TTL
    pub fn touch(&mut self, ttl: Duration) {
        self.expires_at =
            Utc::now() + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(900));
    }
}

/// Session store
pub struct SessionStore {
    sessions: DashMap<Uuid, Session>,
    max_sessions: usize,
    default_ttl: Duration,
}

impl SessionStore {
    /// Create a new session store
    pub fn new(max_sessions: usize, default_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            max_sessions,
            default_ttl,
        }
    }

    /// Create a new session and return its id
    pub fn create(&self) -> Result<Uuid> {
        if self.sessions.len() >= self.max_sessions {
            self.cleanup_expired();
            if self.sessions.len() >= self.max_sessions {
                return Err(ServerError::MaxSessionsReached);
            }
        }
        let session = Session::new(self.default_ttl);
        let id = session.id;
        self.sessions.insert(id, session);
        Ok(id)
    }

    /// Validate a session: exists and unexpired. Extends the TTL on
    /// activity and returns a snapshot.
    pub fn validate(&self, id: &Uuid) -> Result<Session> {
        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))?;

        if session.is_expired() {
            drop(session);
            self.sessions.remove(id);
            return Err(ServerError::SessionExpired(id.to_string()));
        }

        session.touch(self.default_ttl);
        Ok(session.clone())
    }

    /// Record that a session's evaluation keys are installed
    pub fn mark_keys_ready(&self, id: &Uuid, pir_client_id: u64) -> Result<()> {
        let mut session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| ServerError::SessionNotFound(id.to_string()))?;
        session.keys_ready = true;
        session.pir_client_id = Some(pir_client_id);
        Ok(())
    }

    /// Remove a session
    pub fn remove(&self, id: &Uuid) -> Option<Session> {
        self.sessions.remove(id).map(|(_, s)| s)
    }

    /// Drop expired sessions
    pub fn cleanup_expired(&self) {
        self.sessions.retain(|_, session| !session.is_expired());
        tracing::debug!("Cleaned up sessions, {} remaining", self.sessions.len());
    }

    /// Current session count
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
