//! Record normalizer: flattens an origin chat, sender and message into storage-ready records.
//!
//! Pure transform. Every output field has a defined fallback, so normalization cannot fail.

use chrono::{DateTime, Utc};
use chatlog_core::{OriginChat, OriginGroup, OriginMessage, OriginUser};
use storage::{ChatMetadata, ChatSummary, ChatType, MessageRawData, NewMessage};

/// Output of [`normalize`]: the message row to append and the chat summary to upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub message: NewMessage,
    pub chat: ChatSummary,
}

/// Normalizes using the current time as the fallback message date.
pub fn normalize(
    chat: &OriginChat,
    sender: Option<&OriginUser>,
    message: &OriginMessage,
) -> NormalizedRecord {
    normalize_at(chat, sender, message, Utc::now())
}

/// Normalizes with an explicit observation time, used when the origin message carries no date.
pub fn normalize_at(
    chat: &OriginChat,
    sender: Option<&OriginUser>,
    message: &OriginMessage,
    observed_at: DateTime<Utc>,
) -> NormalizedRecord {
    let summary = summarize_chat(chat);

    let (is_reply, reply_to_message_id) = match &message.reply_to {
        Some(reply) => (true, reply.message_id),
        None => (false, None),
    };

    let media_type = message.media.as_ref().map(|m| m.tag().to_string());

    let raw_data = MessageRawData {
        message_id: message.id,
        date: message.date,
        views: message.views,
        forwards: message.forwards,
        replies: message.replies,
    };

    let record = NewMessage {
        message_id: message.id,
        chat_id: summary.chat_id,
        chat_title: Some(summary.chat_title.clone()),
        chat_type: summary.chat_type,
        user_id: sender.map(|s| s.id),
        username: sender.and_then(|s| s.username.clone()),
        first_name: sender.and_then(|s| s.first_name.clone()),
        last_name: sender.and_then(|s| s.last_name.clone()),
        message_text: message_text(message),
        date: message.date.unwrap_or(observed_at),
        is_reply,
        reply_to_message_id,
        has_media: media_type.is_some(),
        media_type,
        raw_data: raw_data.to_json(),
    };

    NormalizedRecord {
        message: record,
        chat: summary,
    }
}

/// Chat summary for the registry, classified by origin kind.
pub fn summarize_chat(chat: &OriginChat) -> ChatSummary {
    let metadata = ChatMetadata {
        access_hash: chat.access_hash(),
        username: chat.username().map(str::to_string),
    };

    match chat {
        OriginChat::Person(user) => ChatSummary {
            chat_id: user.id,
            chat_title: person_title(user),
            chat_type: ChatType::Private,
            participants_count: Some(1),
            metadata,
        },
        OriginChat::Group(group) => ChatSummary {
            chat_id: group.id,
            chat_title: group_title(group),
            chat_type: if group.broadcast {
                ChatType::Channel
            } else {
                ChatType::Group
            },
            participants_count: group.participants_count,
            metadata,
        },
        OriginChat::Unknown { id } => ChatSummary {
            chat_id: id.unwrap_or(0),
            chat_title: "Unknown".to_string(),
            chat_type: ChatType::Unknown,
            participants_count: None,
            metadata,
        },
    }
}

/// "first last", else "@username", else "User <id>".
fn person_title(user: &OriginUser) -> String {
    let full_name = format!(
        "{} {}",
        user.first_name.as_deref().unwrap_or(""),
        user.last_name.as_deref().unwrap_or("")
    );
    let full_name = full_name.trim();
    if !full_name.is_empty() {
        return full_name.to_string();
    }
    match user.username.as_deref().filter(|u| !u.is_empty()) {
        Some(username) => format!("@{}", username),
        None => format!("User {}", user.id),
    }
}

fn group_title(group: &OriginGroup) -> String {
    group
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Chat {}", group.id))
}

/// Rendered text, else raw text, else empty.
fn message_text(message: &OriginMessage) -> String {
    message
        .text
        .as_deref()
        .filter(|t| !t.is_empty())
        .or_else(|| message.raw_text.as_deref().filter(|t| !t.is_empty()))
        .unwrap_or("")
        .to_string()
}
