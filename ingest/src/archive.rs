//! Persistence seam for ingestion: the archive the pipeline writes to and the front end reads from.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use storage::{ArchiveStore, ChatRecord, ChatSummary, NewMessage, StorageError};

/// Write and summary-read operations the ingestion components need from storage.
#[async_trait]
pub trait MessageArchive: Send + Sync {
    /// Appends a message; returns the surrogate id.
    async fn append_message(&self, message: &NewMessage) -> Result<i64, StorageError>;
    /// Upserts the chat summary; returns the stamped `last_activity`.
    async fn upsert_chat(&self, chat: &ChatSummary) -> Result<DateTime<Utc>, StorageError>;
    async fn count_messages(&self, chat_id: Option<i64>) -> Result<i64, StorageError>;
    /// Chats ordered by most recent activity first.
    async fn list_chats(&self) -> Result<Vec<ChatRecord>, StorageError>;
}

#[async_trait]
impl MessageArchive for ArchiveStore {
    async fn append_message(&self, message: &NewMessage) -> Result<i64, StorageError> {
        self.messages.append(message).await
    }

    async fn upsert_chat(&self, chat: &ChatSummary) -> Result<DateTime<Utc>, StorageError> {
        self.chats.upsert(chat).await
    }

    async fn count_messages(&self, chat_id: Option<i64>) -> Result<i64, StorageError> {
        self.messages.count(chat_id).await
    }

    async fn list_chats(&self) -> Result<Vec<ChatRecord>, StorageError> {
        self.chats.list().await
    }
}
