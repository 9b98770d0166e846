//! Session routing: one actor per conversation, created on demand.
//!
//! Sessions are independent. Each [`SessionHandle`] talks to a Tokio task
//! that owns its own [`ConversationContext`](crate::context::ConversationContext);
//! utterances on one session never observe another's context.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{info, warn};

pub mod actor;

pub use self::actor::Resolution;

use crate::resolver::IntentResolver;
use crate::types::{ConversationTurn, Utterance};

use self::actor::SessionEvent;

/// Session inbox buffer size.
const SESSION_CHANNEL_CAPACITY: usize = 64;

/// Errors talking to a session actor.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The actor has stopped.
    #[error("session {0} is closed")]
    Closed(String),

    /// The actor stopped before replying.
    #[error("session {0} stopped before replying")]
    NoReply(String),
}

// ---------------------------------------------------------------------------
// Session handle
// ---------------------------------------------------------------------------

/// Cheap, cloneable handle to a running session actor.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: String,
    tx: mpsc::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Spawn a session actor on the current Tokio runtime.
    pub fn spawn(id: impl Into<String>, resolver: Arc<IntentResolver>) -> Self {
        let id = id.into();
        let (tx, rx) = mpsc::channel(SESSION_CHANNEL_CAPACITY);
        tokio::spawn(actor::run_session(id.clone(), resolver, rx));
        Self { id, tx }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Submit an utterance and wait for its outcome.
    ///
    /// Resolves to [`Resolution::Superseded`] when a newer utterance on this
    /// session overtakes it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the actor has stopped.
    pub async fn submit(&self, utterance: Utterance) -> Result<Resolution, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionEvent::Utterance { utterance, reply }).await?;
        rx.await.map_err(|_| SessionError::NoReply(self.id.clone()))
    }

    /// Recorded turns, most recent first.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the actor has stopped.
    pub async fn history(&self) -> Result<Vec<ConversationTurn>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionEvent::Snapshot(reply)).await?;
        rx.await.map_err(|_| SessionError::NoReply(self.id.clone()))
    }

    /// Forget the conversation. Supersedes any in-flight resolution.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the actor has stopped.
    pub async fn reset(&self) -> Result<(), SessionError> {
        self.send(SessionEvent::Reset).await
    }

    /// Ask the actor to stop. Stopping an already stopped actor is a no-op.
    pub async fn shutdown(&self) {
        if self.send(SessionEvent::Shutdown).await.is_err() {
            warn!(session = %self.id, "session already closed");
        }
    }

    async fn send(&self, event: SessionEvent) -> Result<(), SessionError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| SessionError::Closed(self.id.clone()))
    }
}

// ---------------------------------------------------------------------------
// Session router
// ---------------------------------------------------------------------------

/// Routes utterances to per-conversation sessions, creating them on demand.
///
/// Dead sessions are replaced with fresh ones on next use.
pub struct SessionRouter {
    sessions: Mutex<HashMap<String, SessionHandle>>,
    resolver: Arc<IntentResolver>,
}

impl std::fmt::Debug for SessionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRouter").finish_non_exhaustive()
    }
}

impl SessionRouter {
    /// Router sharing one resolver across all sessions.
    pub fn new(resolver: Arc<IntentResolver>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            resolver,
        }
    }

    /// Handle for `session_id`, spawning the session if needed.
    pub async fn session(&self, session_id: &str) -> SessionHandle {
        let mut sessions = self.sessions.lock().await;
        if let Some(handle) = sessions.get(session_id) {
            if !handle.is_closed() {
                return handle.clone();
            }
            info!(session = %session_id, "session closed, creating new session");
        }
        let handle = SessionHandle::spawn(session_id, Arc::clone(&self.resolver));
        sessions.insert(session_id.to_owned(), handle.clone());
        handle
    }

    /// Route an utterance to its session and wait for the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the session stops while resolving.
    pub async fn submit(
        &self,
        session_id: &str,
        utterance: Utterance,
    ) -> Result<Resolution, SessionError> {
        self.session(session_id).await.submit(utterance).await
    }

    /// Shut down every session.
    pub async fn shutdown_all(&self) {
        let mut sessions = self.sessions.lock().await;
        for (_, handle) in sessions.drain() {
            handle.shutdown().await;
        }
        info!("all sessions shut down");
    }

    /// Number of known sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
