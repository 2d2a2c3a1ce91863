//! Session ledger — active sessions in memory, archived on end.
//!
//! Lifecycle: initialized empty at process start and torn down at shutdown
//! with in-flight sessions abandoned (no forced flush). A started sessionId
//! is in exactly one of {this map, the archive} at any time.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use voicechain_core::archive::{SessionArchive, SessionSummary};
use voicechain_core::config::{DEFAULT_INSTRUCTIONS, DEFAULT_VOICE};
use voicechain_core::session::{Message, Session};
use voicechain_core::{Result, VoicechainError};

pub struct SessionLedger {
    active: RwLock<HashMap<String, Session>>,
    archive: Arc<SessionArchive>,
}

impl SessionLedger {
    pub fn new(archive: Arc<SessionArchive>) -> Self {
        Self {
            active: RwLock::new(HashMap::new()),
            archive,
        }
    }

    pub fn archive(&self) -> &Arc<SessionArchive> {
        &self.archive
    }

    /// Create a new active session and return its id.
    pub async fn start_session(
        &self,
        voice: Option<String>,
        instructions: Option<String>,
    ) -> String {
        let session = Session::new(
            voice.unwrap_or_else(|| DEFAULT_VOICE.to_string()),
            instructions.unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string()),
        );
        let session_id = session.session_id.clone();
        self.active
            .write()
            .await
            .insert(session_id.clone(), session);
        info!(session_id, "Started session");
        session_id
    }

    /// Append a completed turn's message pair to an active session.
    ///
    /// Unknown sessionId is a logged no-op: the turn already produced its
    /// result and a missing session must not fail it. Never creates a
    /// session. The write lock serializes concurrent appends.
    pub async fn append_turn(&self, session_id: &str, user: Message, assistant: Message) {
        let mut active = self.active.write().await;
        match active.get_mut(session_id) {
            Some(session) => {
                session.append_turn(user, assistant);
                info!(
                    session_id,
                    message_count = session.message_count,
                    "Appended turn to session"
                );
            }
            None => {
                warn!(session_id, "Session not found in ledger, turn not recorded");
            }
        }
    }

    /// End a session: stamp endTime, persist the snapshot, evict from the
    /// map, and return it. Eviction happens only after a successful save,
    /// so a failed save leaves the session active.
    pub async fn end_session(&self, session_id: &str) -> Result<Session> {
        let mut active = self.active.write().await;
        let mut session = active
            .get(session_id)
            .cloned()
            .ok_or_else(|| VoicechainError::SessionNotFound(session_id.to_string()))?;
        session.end_time = Some(Utc::now());

        self.archive.save_session(&session).await?;
        active.remove(session_id);
        info!(
            session_id,
            messages = session.message_count,
            "Ended and archived session"
        );
        Ok(session)
    }

    /// Whether the session is live in the in-memory map.
    pub async fn is_active(&self, session_id: &str) -> bool {
        self.active.read().await.contains_key(session_id)
    }

    /// Snapshot of an active session (None once ended).
    pub async fn active_snapshot(&self, session_id: &str) -> Option<Session> {
        self.active.read().await.get(session_id).cloned()
    }

    /// Historical read over the archive, not the active map.
    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        self.archive.load_session(session_id).await
    }

    /// Historical listing over the archive, newest-first.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.archive.list_sessions().await
    }
}
