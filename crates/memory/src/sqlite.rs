//! SQLite session store.
//!
//! One table, `messages`, keyed by `(session_id, sequence_number)`. The
//! next number is computed by the INSERT itself, inside a transaction,
//! while the session's lock is held, so the log stays gapless even with
//! several connections in the pool.

use async_trait::async_trait;
use chrono::Utc;
use folio_core::error::MemoryError;
use folio_core::memory::SessionStore;
use folio_core::message::{Message, MessageKind, NewMessage, Role, SessionId};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use crate::locks::SessionLocks;

/// A SQLite-backed session store.
pub struct SqliteSessionStore {
    pool: SqlitePool,
    locks: SessionLocks<()>,
}

impl SqliteSessionStore {
    /// Open (or create) a database from a connection string or file path.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database.
    pub async fn new(url: &str) -> Result<Self, MemoryError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| MemoryError::Storage(format!("Invalid SQLite path: {e}")))?;
        Self::connect(options, url).await
    }

    /// Open (or create) a database file.
    pub async fn open(path: &Path) -> Result<Self, MemoryError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MemoryError::Storage(format!("Failed to create database directory: {e}"))
            })?;
        }
        let options = SqliteConnectOptions::new().filename(path);
        Self::connect(options, &path.display().to_string()).await
    }

    async fn connect(options: SqliteConnectOptions, label: &str) -> Result<Self, MemoryError> {
        let options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self::from_pool(pool).await?;
        info!("SQLite session store initialized at {label}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, MemoryError> {
        let store = Self {
            pool,
            locks: SessionLocks::new(),
        };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), MemoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                session_id       TEXT NOT NULL,
                sequence_number  INTEGER NOT NULL,
                role             TEXT NOT NULL,
                kind             TEXT NOT NULL,
                content          TEXT NOT NULL,
                created_at       TEXT NOT NULL,
                PRIMARY KEY (session_id, sequence_number)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MemoryError::MigrationFailed(format!("messages table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<Message, MemoryError> {
        let session_id: String = row
            .try_get("session_id")
            .map_err(|e| MemoryError::QueryFailed(format!("session_id column: {e}")))?;
        let sequence_number: i64 = row
            .try_get("sequence_number")
            .map_err(|e| MemoryError::QueryFailed(format!("sequence_number column: {e}")))?;
        let role: String = row
            .try_get("role")
            .map_err(|e| MemoryError::QueryFailed(format!("role column: {e}")))?;
        let kind: String = row
            .try_get("kind")
            .map_err(|e| MemoryError::QueryFailed(format!("kind column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| MemoryError::QueryFailed(format!("content column: {e}")))?;
        let created_at: String = row
            .try_get("created_at")
            .map_err(|e| MemoryError::QueryFailed(format!("created_at column: {e}")))?;

        let timestamp = chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| MemoryError::QueryFailed(format!("bad created_at '{created_at}': {e}")))?;

        Ok(Message {
            session_id: SessionId::from(session_id),
            sequence_number: sequence_number as u64,
            role: Role::parse(&role)
                .ok_or_else(|| MemoryError::QueryFailed(format!("unknown role '{role}'")))?,
            kind: MessageKind::parse(&kind)
                .ok_or_else(|| MemoryError::QueryFailed(format!("unknown kind '{kind}'")))?,
            content,
            timestamp,
        })
    }

    async fn insert_batch(
        &self,
        session_id: &SessionId,
        messages: Vec<NewMessage>,
    ) -> Result<Vec<u64>, MemoryError> {
        let lock = self.locks.for_session(session_id);
        let _guard = lock.lock().await;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| MemoryError::Storage(format!("BEGIN failed: {e}")))?;

        // Number and insert in one statement: the transaction's first
        // statement is a write, so it never holds a stale read snapshot.
        let mut numbers = Vec::with_capacity(messages.len());
        for message in messages {
            let sequence_number: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO messages (session_id, sequence_number, role, kind, content, created_at)
                SELECT ?1, COALESCE(MAX(sequence_number), 0) + 1, ?2, ?3, ?4, ?5
                FROM messages WHERE session_id = ?1
                RETURNING sequence_number
                "#,
            )
            .bind(session_id.as_str())
            .bind(message.role.as_str())
            .bind(message.kind.as_str())
            .bind(&message.content)
            .bind(Utc::now().to_rfc3339())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| MemoryError::Storage(format!("INSERT failed: {e}")))?;
            numbers.push(sequence_number as u64);
        }

        tx.commit()
            .await
            .map_err(|e| MemoryError::Storage(format!("COMMIT failed: {e}")))?;

        debug!(session = %session_id, count = numbers.len(), "Appended messages");
        Ok(numbers)
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn append(&self, session_id: &SessionId, message: NewMessage) -> Result<u64, MemoryError> {
        let numbers = self.insert_batch(session_id, vec![message]).await?;
        numbers
            .first()
            .copied()
            .ok_or_else(|| MemoryError::Storage("append wrote no message".into()))
    }

    async fn append_all(
        &self,
        session_id: &SessionId,
        messages: Vec<NewMessage>,
    ) -> Result<Vec<u64>, MemoryError> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }
        self.insert_batch(session_id, messages).await
    }

    async fn history(&self, session_id: &SessionId) -> Result<Vec<Message>, MemoryError> {
        let rows = sqlx::query(
            r#"
            SELECT session_id, sequence_number, role, kind, content, created_at
            FROM messages
            WHERE session_id = ?1
            ORDER BY sequence_number ASC
            "#,
        )
        .bind(session_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| MemoryError::QueryFailed(format!("history: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn sessions(&self) -> Result<Vec<SessionId>, MemoryError> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT session_id FROM messages ORDER BY session_id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| MemoryError::QueryFailed(format!("sessions: {e}")))?;
        Ok(ids.into_iter().map(SessionId::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn test_store(dir: &tempfile::TempDir) -> SqliteSessionStore {
        SqliteSessionStore::open(&dir.path().join("sessions.db"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn append_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        let s1 = SessionId::from("s1");

        assert_eq!(store.append(&s1, NewMessage::user_text("What is shown on page 3?")).await.unwrap(), 1);
        assert_eq!(store.append(&s1, NewMessage::image_reference("p3.png")).await.unwrap(), 2);

        let history = store.history(&s1).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "What is shown on page 3?");
        assert_eq!(history[1].kind, MessageKind::ImageReference);
        assert_eq!(history[1].role, Role::User);
        assert_eq!(history[1].session_id, s1);
    }

    #[tokio::test]
    async fn numbering_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let s = SessionId::from("s");
        {
            let store = test_store(&dir).await;
            store
                .append_all(&s, vec![NewMessage::user_text("q"), NewMessage::agent_text("a")])
                .await
                .unwrap();
        }
        let store = test_store(&dir).await;
        assert_eq!(store.append(&s, NewMessage::user_text("q2")).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn sessions_lists_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        store.append(&SessionId::from("b"), NewMessage::user_text("1")).await.unwrap();
        store.append(&SessionId::from("a"), NewMessage::user_text("1")).await.unwrap();
        store.append(&SessionId::from("a"), NewMessage::user_text("2")).await.unwrap();
        assert_eq!(
            store.sessions().await.unwrap(),
            vec![SessionId::from("a"), SessionId::from("b")]
        );
    }

    #[tokio::test]
    async fn unreadable_timestamp_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = test_store(&dir).await;
        let s = SessionId::from("s");
        store.append(&s, NewMessage::user_text("q")).await.unwrap();
        sqlx::query("UPDATE messages SET created_at = 'yesterday'")
            .execute(&store.pool)
            .await
            .unwrap();

        let err = store.history(&s).await.unwrap_err();
        assert!(matches!(err, MemoryError::QueryFailed(msg) if msg.contains("yesterday")));
    }

    #[tokio::test]
    async fn in_memory_url_works() {
        let store = SqliteSessionStore::new("sqlite::memory:").await.unwrap();
        let s = SessionId::from("s");
        store.append(&s, NewMessage::user_text("hello")).await.unwrap();
        assert_eq!(store.history(&s).await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_sessions_stay_gapless() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(test_store(&dir).await);
        let mut handles = Vec::new();
        for s in 0..4 {
            for _ in 0..2 {
                let store = store.clone();
                handles.push(tokio::spawn(async move {
                    let session = SessionId::from(format!("s{s}"));
                    for i in 0..5 {
                        store.append(&session, NewMessage::user_text(format!("m{i}"))).await.unwrap();
                    }
                }));
            }
        }
        for h in handles {
            h.await.unwrap();
        }

        for s in 0..4 {
            let history = store.history(&SessionId::from(format!("s{s}"))).await.unwrap();
            let numbers: Vec<u64> = history.iter().map(|m| m.sequence_number).collect();
            assert_eq!(numbers, (1..=10).collect::<Vec<u64>>());
        }
    }
}
