//! In-memory session store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use folio_core::error::MemoryError;
use folio_core::memory::SessionStore;
use folio_core::message::{Message, NewMessage, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

type SessionLog = Arc<Mutex<Vec<Message>>>;

/// Keeps every session log in process memory.
///
/// The outer `RwLock` only guards the session map; each log has its own
/// mutex, so appends to different sessions proceed in parallel.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SessionLog>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    async fn log_for(&self, session_id: &SessionId) -> SessionLog {
        if let Some(log) = self.sessions.read().await.get(session_id) {
            return log.clone();
        }
        self.sessions
            .write()
            .await
            .entry(session_id.clone())
            .or_default()
            .clone()
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn append(&self, session_id: &SessionId, message: NewMessage) -> Result<u64, MemoryError> {
        let log = self.log_for(session_id).await;
        let mut log = log.lock().await;
        let sequence_number = log.len() as u64 + 1;
        log.push(message.into_message(session_id, sequence_number));
        Ok(sequence_number)
    }

    async fn append_all(
        &self,
        session_id: &SessionId,
        messages: Vec<NewMessage>,
    ) -> Result<Vec<u64>, MemoryError> {
        let log = self.log_for(session_id).await;
        let mut log = log.lock().await;
        let mut numbers = Vec::with_capacity(messages.len());
        for message in messages {
            let sequence_number = log.len() as u64 + 1;
            log.push(message.into_message(session_id, sequence_number));
            numbers.push(sequence_number);
        }
        Ok(numbers)
    }

    async fn history(&self, session_id: &SessionId) -> Result<Vec<Message>, MemoryError> {
        let log = match self.sessions.read().await.get(session_id) {
            Some(log) => log.clone(),
            None => return Ok(Vec::new()),
        };
        let log = log.lock().await;
        Ok(log.clone())
    }

    async fn sessions(&self) -> Result<Vec<SessionId>, MemoryError> {
        let logs: Vec<(SessionId, SessionLog)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, log)| (id.clone(), log.clone()))
            .collect();

        let mut ids = Vec::new();
        for (id, log) in logs {
            if !log.lock().await.is_empty() {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}
