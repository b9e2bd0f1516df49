//! Restricted execution context handed to plugin handlers.
//!
//! Plugins never see the registry or process internals, only the
//! capability to request a session by identifier.

use std::sync::Arc;

use webpilot_core::Result;
use webpilot_session::{Session, SessionRegistry, SessionSummary};

#[derive(Clone)]
pub struct PluginContext {
    sessions: Arc<SessionRegistry>,
}

impl PluginContext {
    pub fn new(sessions: Arc<SessionRegistry>) -> Self {
        Self { sessions }
    }

    /// Fetch a live session by id. This is the whole capability surface
    /// a plugin gets; errors with `SessionNotFound` for unknown ids.
    pub async fn session(&self, id: &str) -> Result<Arc<Session>> {
        self.sessions.require(id).await
    }

    /// Read-only metadata snapshot for a session, if it exists.
    pub async fn session_summary(&self, id: &str) -> Option<SessionSummary> {
        match self.sessions.get(id).await {
            Some(session) => Some(session.summary().await),
            None => None,
        }
    }
}
