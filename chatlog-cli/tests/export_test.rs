//! Integration tests for the file exports and archive statistics.
//!
//! Uses a temp dir for the database and output files.

use chatlog_cli::export;
use chrono::{Duration, TimeZone, Utc};
use storage::{ArchiveStore, ChatMetadata, ChatSummary, ChatType, MessageRawData, NewMessage};
use tempfile::TempDir;

const GROUP_ID: i64 = -1001;

fn message(message_id: i64, chat_id: i64, minute: i64, text: &str, user_id: Option<i64>) -> NewMessage {
    let date = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap() + Duration::minutes(minute);
    NewMessage {
        message_id,
        chat_id,
        chat_title: Some("Team, \"core\"".to_string()),
        chat_type: ChatType::Group,
        user_id,
        username: user_id.map(|_| "alice".to_string()),
        first_name: None,
        last_name: None,
        message_text: text.to_string(),
        date,
        is_reply: false,
        reply_to_message_id: None,
        has_media: false,
        media_type: None,
        raw_data: MessageRawData {
            message_id,
            date: Some(date),
            views: Some(3),
            ..MessageRawData::default()
        }
        .to_json(),
    }
}

async fn seeded_store(dir: &TempDir) -> ArchiveStore {
    let url = format!("file:{}/archive.db", dir.path().display());
    let store = ArchiveStore::open(&url).await.expect("Failed to open store");

    store.messages.append(&message(1, GROUP_ID, 1, "first", Some(10))).await.unwrap();
    store.messages.append(&message(2, GROUP_ID, 3, "line one\nline two", None)).await.unwrap();
    store.messages.append(&message(1, 55, 2, "elsewhere", Some(11))).await.unwrap();
    store
        .chats
        .upsert(&ChatSummary {
            chat_id: GROUP_ID,
            chat_title: "Team".to_string(),
            chat_type: ChatType::Group,
            participants_count: Some(3),
            metadata: ChatMetadata::default(),
        })
        .await
        .unwrap();
    store
}

/// **Test: JSON export lists every message newest first with raw_data as an object.**
#[tokio::test]
async fn test_export_json() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir).await;
    let output = dir.path().join("all.json");

    let count = export::export_json(&store, &output).await.unwrap();
    assert_eq!(count, 3);

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let messages = value.as_array().unwrap();
    let texts: Vec<&str> = messages
        .iter()
        .map(|m| m["message_text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["line one\nline two", "elsewhere", "first"]);
    assert_eq!(messages[2]["raw_data"]["views"], 3);
    assert!(messages[0]["user_id"].is_null());
    assert!(messages[0].get("created_at").is_none());
}

/// **Test: CSV export has a header, omits raw_data, leaves nulls empty and quotes special fields.**
#[tokio::test]
async fn test_export_csv() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir).await;
    let output = dir.path().join("all.csv");

    let count = export::export_csv(&store, &output).await.unwrap();
    assert_eq!(count, 3);

    let csv = std::fs::read_to_string(&output).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.starts_with("message_id,chat_id,chat_title"));
    assert!(!header.contains("raw_data"));

    // Newest row: quoted title with doubled quotes, empty user_id, quoted multi-line text.
    assert!(csv.contains("2,-1001,\"Team, \"\"core\"\"\",group,,,,,\"line one\nline two\","));
}

/// **Test: Chat export is oldest first and titled from the chat registry, else chat_<id>.**
#[tokio::test]
async fn test_export_chat() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir).await;

    let output = dir.path().join("team.json");
    let exported = export::export_chat(&store, GROUP_ID, &output).await.unwrap();
    assert_eq!(exported.chat_title, "Team");
    assert_eq!(exported.total_messages, 2);

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(value["chat_id"], GROUP_ID);
    assert_eq!(value["total_messages"], 2);
    assert_eq!(value["messages"][0]["message_text"], "first");
    assert!(value["export_date"].is_string());

    let unregistered = export::export_chat(&store, 55, &dir.path().join("other.json"))
        .await
        .unwrap();
    assert_eq!(unregistered.chat_title, "chat_55");
}

/// **Test: Statistics count messages, distinct chats and distinct non-null users.**
#[tokio::test]
async fn test_stats() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir).await;

    let stats = export::stats(&store).await.unwrap();
    assert_eq!(stats.total_messages, 3);
    assert_eq!(stats.total_chats, 2);
    assert_eq!(stats.total_users, 2);
    assert_eq!(stats.top_chats[0].chat_id, GROUP_ID);
    assert_eq!(stats.top_chats[0].count, 2);

    let text = export::format_stats(&stats);
    assert!(text.contains("Total messages: 3"));
}
