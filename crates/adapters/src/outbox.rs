//! Outbox poster: writes the posts it would publish to a JSONL file for review.

use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;
use vote_herald_domain::{DeliveryError, PostHandle, Poster, ThreadHandle};

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct OutboxWriter {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
}

impl OutboxWriter {
    pub async fn new(path: PathBuf) -> Result<Self, OutboxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &OutboxEntry<'_>) -> Result<(), OutboxError> {
        let line = serde_json::to_string(entry)?;
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
enum EntryKind {
    Thread,
    Reply,
}

#[derive(Serialize)]
struct OutboxEntry<'a> {
    kind: EntryKind,
    id: &'a str,
    idempotency_key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    in_reply_to: Option<&'a str>,
    text: &'a str,
}

/// Poster that appends every post to an outbox instead of publishing.
///
/// Handles are local uuids, so replies in the file point at the entry
/// of their thread opening.
#[derive(Debug, Clone)]
pub struct OutboxPoster {
    writer: OutboxWriter,
}

impl OutboxPoster {
    pub fn new(writer: OutboxWriter) -> Self {
        Self { writer }
    }

    async fn write(
        &self,
        kind: EntryKind,
        text: &str,
        in_reply_to: Option<&str>,
        idempotency_key: &str,
    ) -> Result<String, DeliveryError> {
        let id = Uuid::new_v4().to_string();
        let entry = OutboxEntry {
            kind,
            id: &id,
            idempotency_key,
            in_reply_to,
            text,
        };

        self.writer
            .append(&entry)
            .await
            .map_err(|error| DeliveryError::Api(format!("Outbox write failed: {}", error)))?;

        Ok(id)
    }
}

#[async_trait]
impl Poster for OutboxPoster {
    async fn start_thread(
        &self,
        text: &str,
        idempotency_key: &str,
    ) -> Result<Option<ThreadHandle>, DeliveryError> {
        let id = self
            .write(EntryKind::Thread, text, None, idempotency_key)
            .await?;
        Ok(Some(ThreadHandle { id }))
    }

    async fn post_reply(
        &self,
        text: &str,
        thread: Option<&ThreadHandle>,
        idempotency_key: &str,
    ) -> Result<Option<PostHandle>, DeliveryError> {
        let id = self
            .write(
                EntryKind::Reply,
                text,
                thread.map(|t| t.id.as_str()),
                idempotency_key,
            )
            .await?;
        Ok(Some(PostHandle { id, url: None }))
    }
}
