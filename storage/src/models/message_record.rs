//! Message record model for persistence.
//!
//! Maps to the `messages` table. [`NewMessage`] is what the ingestion pipeline appends;
//! [`MessageRecord`] is a stored row, including the surrogate key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chat_record::ChatType;

/// Fields preserved alongside a message that the relational columns do not model.
/// Serialized into the `raw_data` column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRawData {
    pub message_id: i64,
    pub date: Option<DateTime<Utc>>,
    pub views: Option<i64>,
    pub forwards: Option<i64>,
    pub replies: Option<i64>,
}

impl MessageRawData {
    /// JSON text for the `raw_data` column; `{}` if serialization ever fails.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// A normalized message ready to be appended. `(message_id, chat_id)` is not unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    pub message_id: i64,
    pub chat_id: i64,
    pub chat_title: Option<String>,
    pub chat_type: ChatType,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub message_text: String,
    pub date: DateTime<Utc>,
    pub is_reply: bool,
    pub reply_to_message_id: Option<i64>,
    pub has_media: bool,
    pub media_type: Option<String>,
    /// Serialized [`MessageRawData`].
    pub raw_data: String,
}

/// A stored message row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageRecord {
    /// Surrogate key assigned by storage.
    pub id: i64,
    pub message_id: i64,
    pub chat_id: i64,
    pub chat_title: Option<String>,
    pub chat_type: String,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub message_text: String,
    pub date: DateTime<Utc>,
    pub is_reply: bool,
    pub reply_to_message_id: Option<i64>,
    pub has_media: bool,
    pub media_type: Option<String>,
    pub raw_data: String,
    pub created_at: DateTime<Utc>,
}

impl MessageRecord {
    /// `raw_data` parsed back into structured JSON; falls back to the raw string.
    pub fn raw_data_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.raw_data)
            .unwrap_or_else(|_| serde_json::Value::String(self.raw_data.clone()))
    }
}
