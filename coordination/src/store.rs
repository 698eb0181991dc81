//! Append-only session persistence.
//!
//! Terminal sessions are written as one JSON object per line. Appends are
//! atomic per record: the line is fully serialized before any byte reaches
//! the file, and a write lock keeps concurrent appends from interleaving.
//! Failed appends retry with backoff; exhaustion surfaces to the caller
//! instead of aborting the debate that produced the session.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::debate::state::DebateSession;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to serialize session: {0}")]
    Serialize(String),
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("append retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

/// Durable record of completed debates.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Append one terminal session. All-or-nothing per record.
    async fn append(&self, session: &DebateSession) -> Result<(), StoreError>;

    /// All stored sessions, in append order.
    async fn list(&self) -> Result<Vec<DebateSession>, StoreError>;
}

/// File-backed store, one JSON session per line.
pub struct JsonlSessionStore {
    path: PathBuf,
    max_retries: u32,
    retry_backoff: Duration,
    write_lock: Mutex<()>,
}

impl JsonlSessionStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_retries: 3,
            retry_backoff: Duration::from_millis(250),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_retry_policy(mut self, max_retries: u32, retry_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_backoff = retry_backoff;
        self
    }

    async fn append_line(&self, line: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for JsonlSessionStore {
    async fn append(&self, session: &DebateSession) -> Result<(), StoreError> {
        // Serialize before touching the file so a serde failure leaves the
        // log untouched.
        let mut line = serde_json::to_string(session)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut backoff = self.retry_backoff;
        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    session_id = %session.id,
                    attempt,
                    "retrying session append after {:?}",
                    backoff
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            match self.append_line(&line).await {
                Ok(()) => {
                    tracing::info!(session_id = %session.id, path = %self.path.display(), "session persisted");
                    return Ok(());
                }
                Err(e) => last_error = e.to_string(),
            }
        }
        Err(StoreError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }

    async fn list(&self) -> Result<Vec<DebateSession>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut sessions = Vec::new();
        for (number, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<DebateSession>(line) {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    // A torn or corrupt line must not hide the rest of the log.
                    tracing::warn!(
                        path = %self.path.display(),
                        line = number + 1,
                        error = %e,
                        "skipping unparseable session record"
                    );
                }
            }
        }
        Ok(sessions)
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<Vec<DebateSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn append(&self, session: &DebateSession) -> Result<(), StoreError> {
        self.sessions.lock().await.push(session.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<DebateSession>, StoreError> {
        Ok(self.sessions.lock().await.clone())
    }
}
