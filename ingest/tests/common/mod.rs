//! Shared fixtures for ingest integration tests.

#![allow(dead_code)]

pub mod fake_transport;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chatlog_core::{OriginChat, OriginGroup, OriginMessage, OriginUser};
use chrono::{DateTime, Duration, TimeZone, Utc};
use ingest::MessageArchive;
use storage::{ArchiveStore, ChatRecord, ChatSummary, NewMessage, StorageError};

pub const GROUP_ID: i64 = -1001;

pub fn group_chat(id: i64, username: &str) -> OriginChat {
    OriginChat::Group(OriginGroup {
        id,
        title: Some(format!("Group {}", username)),
        username: Some(username.to_string()),
        participants_count: Some(3),
        access_hash: Some(77),
        broadcast: false,
    })
}

pub fn user(id: i64, username: &str) -> OriginUser {
    OriginUser {
        id,
        username: Some(username.to_string()),
        first_name: Some(username.to_uppercase()),
        last_name: None,
        access_hash: None,
    }
}

pub fn at_minute(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::minutes(minute)
}

/// `count` text messages with ids 1..=count, one minute apart.
pub fn history(count: i64) -> Vec<OriginMessage> {
    (1..=count)
        .map(|id| OriginMessage::text(id, at_minute(id), format!("message {}", id)))
        .collect()
}

pub async fn sqlite_store() -> ArchiveStore {
    ArchiveStore::open("sqlite::memory:")
        .await
        .expect("Failed to open store")
}

/// In-memory archive with switchable write failures. Avoids real I/O so paused-clock tests stay deterministic.
#[derive(Default)]
pub struct MemoryArchive {
    pub messages: Mutex<Vec<NewMessage>>,
    pub chats: Mutex<Vec<ChatSummary>>,
    pub fail_appends: AtomicBool,
    pub fail_upserts: AtomicBool,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message_ids(&self) -> Vec<i64> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.message_id)
            .collect()
    }

    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageArchive for MemoryArchive {
    async fn append_message(&self, message: &NewMessage) -> Result<i64, StorageError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StorageError::Database("disk I/O error".to_string()));
        }
        let mut messages = self.messages.lock().unwrap();
        messages.push(message.clone());
        Ok(messages.len() as i64)
    }

    async fn upsert_chat(&self, chat: &ChatSummary) -> Result<DateTime<Utc>, StorageError> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(StorageError::Database("database is locked".to_string()));
        }
        let mut chats = self.chats.lock().unwrap();
        chats.retain(|c| c.chat_id != chat.chat_id);
        chats.push(chat.clone());
        Ok(Utc::now())
    }

    async fn count_messages(&self, chat_id: Option<i64>) -> Result<i64, StorageError> {
        let messages = self.messages.lock().unwrap();
        Ok(messages
            .iter()
            .filter(|m| chat_id.map_or(true, |id| m.chat_id == id))
            .count() as i64)
    }

    async fn list_chats(&self) -> Result<Vec<ChatRecord>, StorageError> {
        Ok(Vec::new())
    }
}
