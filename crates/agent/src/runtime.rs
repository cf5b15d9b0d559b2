use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use vlog_core::config::AppConfig;
use vlog_core::errors::ApplicationError;
use vlog_db::{ActivityStore, StoredActivity};

use crate::conversation::{ConversationSession, ExtractionPipeline, TurnReply};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("unknown conversation session {0}")]
    UnknownSession(SessionId),
    #[error(transparent)]
    Application(#[from] ApplicationError),
}

/// Owns the shared pipeline and store; each session keeps its own record.
pub struct AgentRuntime {
    pipeline: ExtractionPipeline,
    store: Arc<dyn ActivityStore>,
    sessions: RwLock<HashMap<SessionId, Arc<ConversationSession>>>,
}

impl AgentRuntime {
    pub fn new(pipeline: ExtractionPipeline, store: Arc<dyn ActivityStore>) -> Self {
        Self { pipeline, store, sessions: RwLock::new(HashMap::new()) }
    }

    pub fn from_config(config: &AppConfig, store: Arc<dyn ActivityStore>) -> Self {
        Self::new(ExtractionPipeline::from_config(config), store)
    }

    pub fn remote_available(&self) -> bool {
        self.pipeline.remote_available()
    }

    pub async fn start_session(&self) -> (SessionId, Arc<ConversationSession>) {
        let id = SessionId::new();
        let session = Arc::new(ConversationSession::new(self.pipeline.clone()));
        self.sessions.write().await.insert(id, Arc::clone(&session));
        info!(event_name = "conversation.session.started", session_id = %id, "session started");
        (id, session)
    }

    pub async fn session(&self, id: SessionId) -> Result<Arc<ConversationSession>, AgentError> {
        self.sessions.read().await.get(&id).cloned().ok_or(AgentError::UnknownSession(id))
    }

    pub async fn handle_message(&self, id: SessionId, text: &str) -> Result<TurnReply, AgentError> {
        let session = self.session(id).await?;
        Ok(session.handle_utterance(text, self.store.as_ref()).await)
    }

    pub async fn confirm(&self, id: SessionId) -> Result<i64, AgentError> {
        let session = self.session(id).await?;
        Ok(session.confirm(self.store.as_ref()).await?)
    }

    pub async fn end_session(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().await.remove(&id).is_some();
        if removed {
            info!(event_name = "conversation.session.ended", session_id = %id, "session ended");
        }
        removed
    }

    pub async fn recent(&self, limit: u32) -> Result<Vec<StoredActivity>, AgentError> {
        self.store
            .recent(limit)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()).into())
    }
}
