//! Session registry.
//!
//! Owns the mapping from session identifier to live driver handle plus
//! metadata. No other component holds a session past one dispatched
//! call; the registry hands out `Arc<Session>` and the per-session
//! driver mutex serializes all primitive calls on one instance.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use webpilot_core::{Error, Result};
use webpilot_driver::{Driver, DriverHandle, OpenOptions};

pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    last_used: RwLock<DateTime<Utc>>,
    label: RwLock<Option<String>>,
    alive: AtomicBool,
    /// All driver calls on this session go through here; holding the
    /// guard across a whole action sequence is what keeps overlapping
    /// sequences from interleaving primitive calls.
    pub driver: Mutex<Box<dyn DriverHandle>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

impl Session {
    fn new(id: String, handle: Box<dyn DriverHandle>, label: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            last_used: RwLock::new(now),
            label: RwLock::new(label),
            alive: AtomicBool::new(true),
            driver: Mutex::new(handle),
        }
    }

    /// Update the last-used timestamp. Called by every operation
    /// addressed to this session.
    pub async fn touch(&self) {
        *self.last_used.write().await = Utc::now();
    }

    pub async fn last_used(&self) -> DateTime<Utc> {
        *self.last_used.read().await
    }

    pub async fn label(&self) -> Option<String> {
        self.label.read().await.clone()
    }

    pub async fn set_label(&self, label: Option<String>) {
        *self.label.write().await = label;
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    pub async fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            created_at: self.created_at,
            last_used: self.last_used().await,
            alive: self.is_alive(),
            label: self.label().await,
        }
    }
}

/// Owned snapshot of one session's metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub alive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

pub struct SessionRegistry {
    driver: Arc<dyn Driver>,
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Open a new browser instance and bind it to `requested_id` (or a
    /// generated id). Fails with `DuplicateSessionId` if the id is
    /// already live; an existing session is never silently replaced.
    pub async fn create(
        &self,
        requested_id: Option<&str>,
        opts: &OpenOptions,
        label: Option<String>,
    ) -> Result<Arc<Session>> {
        let id = match requested_id {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().to_string(),
        };

        if self.sessions.read().await.contains_key(&id) {
            return Err(Error::DuplicateSessionId(id));
        }

        // The driver open is a multi-second process launch, so it runs
        // outside the map lock; the insert re-checks for a racing
        // create with the same id and the loser gives up its handle.
        let handle = self.driver.open(opts).await?;

        let session = Arc::new(Session::new(id.clone(), handle, label));
        {
            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&id) {
                drop(sessions);
                let mut handle = session.driver.lock().await;
                if let Err(e) = handle.close().await {
                    warn!(session = %id, error = %e, "Failed to release losing handle");
                }
                return Err(Error::DuplicateSessionId(id));
            }
            sessions.insert(id.clone(), session.clone());
        }

        info!(session = %id, "Session created");
        Ok(session)
    }

    /// Look up a session. Touches the last-used timestamp on success.
    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        let session = self.sessions.read().await.get(id).cloned();
        if let Some(ref session) = session {
            session.touch().await;
        }
        session
    }

    /// Like `get`, but with the registry's error for absent ids.
    pub async fn require(&self, id: &str) -> Result<Arc<Session>> {
        self.get(id)
            .await
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Owned snapshot of all sessions, not a live view.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions.values() {
            summaries.push(session.summary().await);
        }
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        summaries
    }

    /// Close a session and release its driver handle. Idempotent:
    /// closing an absent id is a no-op, not an error. Release failures
    /// are logged, never propagated.
    pub async fn close(&self, id: &str) {
        // Removed from the map first so concurrent lookups cannot hand
        // out a session whose handle is mid-release; the handle is
        // still always released below.
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(session) => {
                session.alive.store(false, Ordering::Relaxed);
                let mut handle = session.driver.lock().await;
                if let Err(e) = handle.close().await {
                    warn!(session = %id, error = %e, "Driver release failed");
                }
                info!(session = %id, "Session closed");
            }
            None => {
                debug!(session = %id, "Close for unknown session; ignoring");
            }
        }
    }

    /// Close every session. Called at process shutdown.
    pub async fn close_all(&self) {
        let ids: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        for id in ids {
            self.close(&id).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use webpilot_driver::testing::{MockBehavior, MockDriver};

    fn registry() -> SessionRegistry {
        SessionRegistry::new(Arc::new(MockDriver::new()))
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let reg = registry();
        let session = reg.create(Some("a"), &OpenOptions::default(), None).await.unwrap();
        assert_eq!(session.id, "a");
        let fetched = reg.get("a").await.unwrap();
        assert_eq!(fetched.id, "a");
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let reg = registry();
        reg.create(Some("a"), &OpenOptions::default(), None).await.unwrap();
        let err = reg
            .create(Some("a"), &OpenOptions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateSessionId(_)));
        // The first session is untouched.
        assert!(reg.get("a").await.is_some());
    }

    #[tokio::test]
    async fn test_generated_ids_are_unique() {
        let reg = registry();
        let s1 = reg.create(None, &OpenOptions::default(), None).await.unwrap();
        let s2 = reg.create(None, &OpenOptions::default(), None).await.unwrap();
        assert_ne!(s1.id, s2.id);
        assert_eq!(reg.list().await.len(), 2);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let driver = MockDriver::new();
        let journal = driver.journal();
        let reg = SessionRegistry::new(Arc::new(driver));
        reg.create(Some("a"), &OpenOptions::default(), None).await.unwrap();
        reg.close("a").await;
        reg.close("a").await;
        assert!(reg.get("a").await.is_none());
        let closes = journal
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.as_str() == "close")
            .count();
        assert_eq!(closes, 1);
    }

    #[tokio::test]
    async fn test_close_unknown_id_is_noop() {
        let reg = registry();
        reg.create(Some("a"), &OpenOptions::default(), None).await.unwrap();
        reg.close("nonexistent-id").await;
        assert_eq!(reg.list().await.len(), 1);
    }

    #[tokio::test]
    async fn test_id_reusable_after_close() {
        let reg = registry();
        reg.create(Some("a"), &OpenOptions::default(), None).await.unwrap();
        reg.close("a").await;
        assert!(reg.create(Some("a"), &OpenOptions::default(), None).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_touches_last_used() {
        let reg = registry();
        let session = reg.create(Some("a"), &OpenOptions::default(), None).await.unwrap();
        let before = session.last_used().await;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        reg.get("a").await.unwrap();
        assert!(session.last_used().await > before);
    }

    #[tokio::test]
    async fn test_failed_open_leaves_registry_empty() {
        let reg = SessionRegistry::new(Arc::new(MockDriver::with_behavior(MockBehavior {
            fail_open: true,
            ..Default::default()
        })));
        assert!(reg.create(Some("a"), &OpenOptions::default(), None).await.is_err());
        assert!(reg.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_list_is_snapshot_with_labels() {
        let reg = registry();
        reg.create(Some("a"), &OpenOptions::default(), Some("checkout flow".into()))
            .await
            .unwrap();
        let summaries = reg.list().await;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].label.as_deref(), Some("checkout flow"));
        assert!(summaries[0].alive);
    }
}
