//! Server-side session storage.
//!
//! # Purpose
//! Sessions are opaque-id keyed records held server-side; the browser only
//! carries the id in a cookie. The store trait is pluggable so tests use the
//! in-memory map and a durable backend can be added without touching the
//! guard.
//!
//! # Concurrency
//! Concurrent requests on the same session (two browser tabs) operate on the
//! same record; writes are last-writer-wins with no cross-request locking,
//! an accepted race for this class of application.
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use metrics::gauge;
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Opaque session identifier: 32 bytes from the OS RNG, hex-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn from_cookie_value(value: &str) -> Self {
        Self(value.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Per-session server state. `previous_tenant_id` is kept for audit and the
/// UI's "previous tenant" display after a switch.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub previous_tenant_id: Option<Uuid>,
    pub csrf_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(user_id: Uuid, tenant_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            tenant_id,
            previous_tenant_id: None,
            csrf_token: None,
            created_at: now,
            last_activity: now,
        }
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a record under a freshly generated id and return the id.
    async fn create(&self, record: SessionRecord) -> SessionId;
    /// Fetch a live record; expired sessions are removed and report absent.
    async fn get(&self, id: &SessionId) -> Option<SessionRecord>;
    /// Overwrite a record (tenant switch, CSRF mint, activity touch).
    /// Last-writer-wins.
    async fn put(&self, id: &SessionId, record: SessionRecord);
    /// Destroy a session. Idempotent.
    async fn remove(&self, id: &SessionId);
}

/// In-memory session store with lazy idle-timeout expiry.
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionRecord>>>,
    idle_timeout: Duration,
}

impl InMemorySessionStore {
    pub fn new(idle_timeout: std::time::Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout: Duration::from_std(idle_timeout)
                .unwrap_or_else(|_| Duration::seconds(i64::MAX / 1_000)),
        }
    }

    fn is_expired(&self, record: &SessionRecord) -> bool {
        // An idle deadline past the end of representable time never expires.
        match record.last_activity.checked_add_signed(self.idle_timeout) {
            Some(deadline) => deadline < Utc::now(),
            None => false,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, record: SessionRecord) -> SessionId {
        let id = SessionId::generate();
        let mut sessions = self.sessions.write().await;
        sessions.insert(id.as_str().to_string(), record);
        gauge!("teamgate_sessions_active").set(sessions.len() as f64);
        id
    }

    async fn get(&self, id: &SessionId) -> Option<SessionRecord> {
        {
            let sessions = self.sessions.read().await;
            match sessions.get(id.as_str()) {
                Some(record) if !self.is_expired(record) => return Some(record.clone()),
                None => return None,
                Some(_) => {}
            }
        }
        // Expired: evict lazily under the write lock. Another writer may have
        // refreshed the record in between, so re-check before removing.
        let mut sessions = self.sessions.write().await;
        if let Some(record) = sessions.get(id.as_str()) {
            if !self.is_expired(record) {
                return Some(record.clone());
            }
            sessions.remove(id.as_str());
            gauge!("teamgate_sessions_active").set(sessions.len() as f64);
        }
        None
    }

    async fn put(&self, id: &SessionId, record: SessionRecord) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(id.as_str().to_string(), record);
    }

    async fn remove(&self, id: &SessionId) {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id.as_str());
        gauge!("teamgate_sessions_active").set(sessions.len() as f64);
    }
}
