//! SessionStore trait: the durable, append-only conversation log.
//!
//! Each session is an ordered log of [`Message`]s. The store alone assigns
//! sequence numbers: strictly increasing, gapless, starting at 1. Writes to
//! one session are serialized; different sessions never wait on each other.
//! There is no update and no delete.

use async_trait::async_trait;
use crate::error::MemoryError;
use crate::message::{Message, NewMessage, SessionId};

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// A short name for logs (e.g. "sqlite").
    fn name(&self) -> &str;

    /// Append one message, returning the sequence number it was given.
    async fn append(
        &self,
        session_id: &SessionId,
        message: NewMessage,
    ) -> std::result::Result<u64, MemoryError>;

    /// Append a batch so that it lands contiguously in the log.
    ///
    /// Returns the assigned sequence numbers in order. The default
    /// implementation appends one by one; backends with a per-session lock
    /// override it to hold the lock for the whole batch.
    async fn append_all(
        &self,
        session_id: &SessionId,
        messages: Vec<NewMessage>,
    ) -> std::result::Result<Vec<u64>, MemoryError> {
        let mut numbers = Vec::with_capacity(messages.len());
        for message in messages {
            numbers.push(self.append(session_id, message).await?);
        }
        Ok(numbers)
    }

    /// All messages of a session, oldest first. Unknown sessions are empty.
    async fn history(&self, session_id: &SessionId) -> std::result::Result<Vec<Message>, MemoryError>;

    /// Every session that has at least one message.
    async fn sessions(&self) -> std::result::Result<Vec<SessionId>, MemoryError>;
}
