//! Aggregate statistics for the archive.
//!
//! Returned by MessageRepository::stats.

use serde::{Deserialize, Serialize};

/// Message count for one chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessageCount {
    pub chat_id: i64,
    pub chat_title: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveStats {
    pub total_messages: i64,
    pub total_chats: i64,
    /// Distinct non-null senders.
    pub total_users: i64,
    /// Chats with the most stored messages, descending.
    pub top_chats: Vec<ChatMessageCount>,
}
