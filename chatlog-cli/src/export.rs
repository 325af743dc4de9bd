//! File exports and statistics over the archive.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use storage::{ArchiveStats, ArchiveStore, MessageQuery, MessageRecord, SortOrder};
use tracing::info;

const STATS_TOP_CHATS: i64 = 10;

/// One exported message: the stored columns without the surrogate key and insertion time.
#[derive(Debug, Serialize)]
pub struct ExportedMessage {
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
    pub raw_data: serde_json::Value,
}

impl From<&MessageRecord> for ExportedMessage {
    fn from(record: &MessageRecord) -> Self {
        Self {
            message_id: record.message_id,
            chat_id: record.chat_id,
            chat_title: record.chat_title.clone(),
            chat_type: record.chat_type.clone(),
            user_id: record.user_id,
            username: record.username.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            message_text: record.message_text.clone(),
            date: record.date,
            is_reply: record.is_reply,
            reply_to_message_id: record.reply_to_message_id,
            has_media: record.has_media,
            media_type: record.media_type.clone(),
            raw_data: record.raw_data_json(),
        }
    }
}

/// Wrapper written by [`export_chat`].
#[derive(Debug, Serialize)]
pub struct ChatExport {
    pub chat_id: i64,
    pub chat_title: String,
    pub total_messages: usize,
    pub export_date: DateTime<Utc>,
    pub messages: Vec<ExportedMessage>,
}

const CSV_COLUMNS: [&str; 14] = [
    "message_id",
    "chat_id",
    "chat_title",
    "chat_type",
    "user_id",
    "username",
    "first_name",
    "last_name",
    "message_text",
    "date",
    "is_reply",
    "reply_to_message_id",
    "has_media",
    "media_type",
];

async fn all_messages(store: &ArchiveStore) -> Result<Vec<MessageRecord>> {
    let query = MessageQuery {
        order: SortOrder::Descending,
        ..MessageQuery::default()
    };
    store
        .messages
        .query(&query)
        .await
        .context("Failed to read messages")
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize export")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Every message, newest first, `raw_data` parsed. Returns the number exported.
pub async fn export_json(store: &ArchiveStore, output: &Path) -> Result<usize> {
    let messages: Vec<ExportedMessage> = all_messages(store)
        .await?
        .iter()
        .map(ExportedMessage::from)
        .collect();
    write_json(output, &messages)?;
    info!(count = messages.len(), output = %output.display(), "Exported messages to JSON");
    Ok(messages.len())
}

/// Every message, newest first, without `raw_data`. Nulls become empty cells.
pub async fn export_csv(store: &ArchiveStore, output: &Path) -> Result<usize> {
    let records = all_messages(store).await?;

    let file = File::create(output).with_context(|| format!("Failed to create {}", output.display()))?;
    write_csv(file, records.iter().map(csv_row))
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(count = records.len(), output = %output.display(), "Exported messages to CSV");
    Ok(records.len())
}

/// Default file name for a chat export: `messages_<id>_<YYYYMMDD>.json`.
pub fn default_chat_export_path(chat_id: i64, now: DateTime<Utc>) -> String {
    format!("messages_{}_{}.json", chat_id, now.format("%Y%m%d"))
}

/// One chat, oldest first, wrapped with the chat title and export time.
pub async fn export_chat(store: &ArchiveStore, chat_id: i64, output: &Path) -> Result<ChatExport> {
    let chat_title = store
        .chats
        .get(chat_id)
        .await
        .context("Failed to read chat registry")?
        .map(|chat| chat.display_title())
        .unwrap_or_else(|| format!("chat_{}", chat_id));

    let records = store
        .messages
        .query(&MessageQuery::chat(chat_id))
        .await
        .context("Failed to read messages")?;

    let export = ChatExport {
        chat_id,
        chat_title,
        total_messages: records.len(),
        export_date: Utc::now(),
        messages: records.iter().map(ExportedMessage::from).collect(),
    };
    write_json(output, &export)?;
    info!(
        chat_id,
        count = export.total_messages,
        output = %output.display(),
        "Exported chat to JSON"
    );
    Ok(export)
}

pub async fn stats(store: &ArchiveStore) -> Result<ArchiveStats> {
    store
        .messages
        .stats(STATS_TOP_CHATS)
        .await
        .context("Failed to collect statistics")
}

pub fn format_stats(stats: &ArchiveStats) -> String {
    let mut text = format!(
        "📊 Archive statistics\nTotal messages: {}\nTotal chats: {}\nTotal users: {}\n\nTop {} chats by message count:\n",
        stats.total_messages, stats.total_chats, stats.total_users, STATS_TOP_CHATS
    );
    for chat in &stats.top_chats {
        let title = chat
            .chat_title
            .clone()
            .unwrap_or_else(|| format!("chat_{}", chat.chat_id));
        text.push_str(&format!("  • {}: {} messages\n", title, chat.count));
    }
    text
}

fn csv_row(record: &MessageRecord) -> Vec<String> {
    fn opt<T: ToString>(value: &Option<T>) -> String {
        value.as_ref().map(ToString::to_string).unwrap_or_default()
    }
    fn flag(value: bool) -> String {
        if value { "1" } else { "0" }.to_string()
    }

    vec![
        record.message_id.to_string(),
        record.chat_id.to_string(),
        opt(&record.chat_title),
        record.chat_type.clone(),
        opt(&record.user_id),
        opt(&record.username),
        opt(&record.first_name),
        opt(&record.last_name),
        record.message_text.clone(),
        record.date.to_rfc3339(),
        flag(record.is_reply),
        opt(&record.reply_to_message_id),
        flag(record.has_media),
        opt(&record.media_type),
    ]
}

/// Header plus rows, CRLF-terminated, fields quoted only when they need it.
fn write_csv<W: io::Write>(writer: W, rows: impl Iterator<Item = Vec<String>>) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);
    csv.write_record(CSV_COLUMNS)?;
    for row in rows {
        csv.write_record(&row)?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_csv_quoting() {
        let mut row = vec![String::new(); CSV_COLUMNS.len()];
        row[0] = "plain".to_string();
        row[1] = "a,b".to_string();
        row[2] = "say \"hi\"".to_string();
        row[3] = "two\nlines".to_string();

        let mut out = Vec::new();
        write_csv(&mut out, std::iter::once(row)).unwrap();
        let text = String::from_utf8(out).unwrap();

        let mut lines = text.split("\r\n");
        assert_eq!(lines.next(), Some(CSV_COLUMNS.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some("plain,\"a,b\",\"say \"\"hi\"\"\",\"two\nlines\",,,,,,,,,,")
        );
    }

    #[test]
    fn test_default_chat_export_path() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(
            default_chat_export_path(-1001, now),
            "messages_-1001_20240501.json"
        );
    }
}
