//! File-based session store: one JSON-lines file per session.
//!
//! Each line is a JSON-encoded `Message`. Appends only ever add lines, so
//! the files are human-inspectable and safe to tail. Corrupted lines are
//! skipped on load with a warning.
//!
//! Storage location: `~/.folio/sessions/<session>.jsonl`

use async_trait::async_trait;
use folio_core::error::MemoryError;
use folio_core::memory::SessionStore;
use folio_core::message::{Message, NewMessage, SessionId};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use crate::locks::SessionLocks;

/// A directory of per-session JSONL logs.
///
/// The per-session lock caches the last sequence number once the file has
/// been read, so appends do not rescan the log.
pub struct FileSessionStore {
    dir: PathBuf,
    locks: SessionLocks<Option<u64>>,
}

impl FileSessionStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), "File session store opened");
        Self {
            dir,
            locks: SessionLocks::new(),
        }
    }

    fn path_for(&self, session_id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.jsonl", encode_file_stem(session_id.as_str())))
    }

    /// Read a session file. A missing file is an empty session.
    async fn load(path: &Path) -> Result<Vec<Message>, MemoryError> {
        Ok(Self::parse(path, &Self::read_raw(path).await?))
    }

    async fn read_raw(path: &Path) -> Result<String, MemoryError> {
        match tokio::fs::read_to_string(path).await {
            Ok(c) => Ok(c),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(MemoryError::Storage(format!(
                "Failed to read session file {}: {e}",
                path.display()
            ))),
        }
    }

    fn parse(path: &Path, content: &str) -> Vec<Message> {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Message>(line) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping corrupted session line");
                    None
                }
            })
            .collect()
    }

    async fn write_batch(
        &self,
        session_id: &SessionId,
        messages: Vec<NewMessage>,
    ) -> Result<Vec<u64>, MemoryError> {
        let lock = self.locks.for_session(session_id);
        let mut last = lock.lock().await;
        let path = self.path_for(session_id);

        // A torn final line must not swallow the first line of this batch.
        let mut lines = String::new();
        let mut next = match *last {
            Some(n) => n + 1,
            None => {
                let content = Self::read_raw(&path).await?;
                if !content.is_empty() && !content.ends_with('\n') {
                    warn!(path = %path.display(), "Session file ends mid-line, starting a new line");
                    lines.push('\n');
                }
                Self::parse(&path, &content)
                    .iter()
                    .map(|m| m.sequence_number)
                    .max()
                    .unwrap_or(0)
                    + 1
            }
        };

        let mut numbers = Vec::with_capacity(messages.len());
        for message in messages {
            let sealed = message.into_message(session_id, next);
            let line = serde_json::to_string(&sealed).map_err(|e| {
                MemoryError::Storage(format!("Failed to serialize message: {e}"))
            })?;
            lines.push_str(&line);
            lines.push('\n');
            numbers.push(next);
            next += 1;
        }

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            MemoryError::Storage(format!("Failed to create session directory: {e}"))
        })?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open session file: {e}")))?;
        let written = match file.write_all(lines.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // The tail may now be torn; rescan before the next batch.
            *last = None;
            return Err(MemoryError::Storage(format!("Failed to write session file: {e}")));
        }

        // Only advance the cache once the write is durable.
        if let Some(&n) = numbers.last() {
            *last = Some(n);
        }
        Ok(numbers)
    }
}

/// Session ids are opaque; keep `[A-Za-z0-9_-]` and percent-encode the rest.
fn encode_file_stem(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for b in id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

fn decode_file_stem(stem: &str) -> Option<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

#[async_trait]
impl SessionStore for FileSessionStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn append(&self, session_id: &SessionId, message: NewMessage) -> Result<u64, MemoryError> {
        let numbers = self.write_batch(session_id, vec![message]).await?;
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
        self.write_batch(session_id, messages).await
    }

    async fn history(&self, session_id: &SessionId) -> Result<Vec<Message>, MemoryError> {
        let mut messages = Self::load(&self.path_for(session_id)).await?;
        messages.sort_by_key(|m| m.sequence_number);
        Ok(messages)
    }

    async fn sessions(&self) -> Result<Vec<SessionId>, MemoryError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(MemoryError::QueryFailed(format!("Failed to list sessions: {e}"))),
        };

        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MemoryError::QueryFailed(format!("Failed to list sessions: {e}")))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(decode_file_stem)
            {
                ids.push(SessionId::from(id));
            }
        }
        ids.sort();
        Ok(ids)
    }
}
