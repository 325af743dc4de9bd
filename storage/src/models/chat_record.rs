//! Chat summary model: one row per chat in the `chats` table, refreshed on every observed message.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized chat kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Private,
    Group,
    Channel,
    Unknown,
}

impl ChatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatType::Private => "private",
            ChatType::Group => "group",
            ChatType::Channel => "channel",
            ChatType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ChatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatType {
    type Err = std::convert::Infallible;

    /// Unrecognized values map to [`ChatType::Unknown`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "private" => ChatType::Private,
            "group" => ChatType::Group,
            "channel" => ChatType::Channel,
            _ => ChatType::Unknown,
        })
    }
}

/// Opaque chat metadata, serialized into the `metadata` column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMetadata {
    pub access_hash: Option<i64>,
    pub username: Option<String>,
}

/// Chat summary to upsert. Timestamps are stamped by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub chat_id: i64,
    pub chat_title: String,
    pub chat_type: ChatType,
    pub participants_count: Option<i64>,
    pub metadata: ChatMetadata,
}

/// A stored chat row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatRecord {
    pub id: i64,
    pub chat_id: i64,
    pub chat_title: Option<String>,
    pub chat_type: String,
    pub participants_count: Option<i64>,
    pub first_seen: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub metadata: String,
}

impl ChatRecord {
    pub fn kind(&self) -> ChatType {
        self.chat_type.parse().unwrap_or(ChatType::Unknown)
    }

    /// Title for display; falls back to `chat_<id>`.
    pub fn display_title(&self) -> String {
        self.chat_title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("chat_{}", self.chat_id))
    }
}
