//! Shared fixtures for runner integration tests.

#![allow(dead_code)]

pub mod mock_replier;

use std::sync::Arc;

use chatlog_core::{
    EventKind, InboundEvent, OriginChat, OriginGroup, OriginMessage, OriginUser,
};
use chatlog_telegram::{ArchiveBot, BotApiTransport};
use chrono::Utc;
use ingest::{Archiver, BackfillOptions};
use storage::ArchiveStore;
use tokio::sync::mpsc;

use mock_replier::{MockReplier, ReplyRecord};

pub const ADMIN_ID: i64 = 10;

pub fn person(id: i64, username: &str) -> OriginUser {
    OriginUser {
        id,
        username: Some(username.to_string()),
        first_name: Some(username.to_string()),
        last_name: None,
        access_hash: None,
    }
}

pub fn group(id: i64, username: &str) -> OriginChat {
    OriginChat::Group(OriginGroup {
        id,
        title: Some(format!("Group {}", username)),
        username: Some(username.to_string()),
        participants_count: None,
        access_hash: None,
        broadcast: true,
    })
}

pub fn private_text(from: &OriginUser, id: i64, text: &str) -> InboundEvent {
    InboundEvent {
        kind: EventKind::New,
        chat: OriginChat::Person(from.clone()),
        sender: Some(from.clone()),
        message: OriginMessage::text(id, Utc::now(), text),
    }
}

pub fn group_text(chat: &OriginChat, from: &OriginUser, id: i64, text: &str) -> InboundEvent {
    InboundEvent {
        kind: EventKind::New,
        chat: chat.clone(),
        sender: Some(from.clone()),
        message: OriginMessage::text(id, Utc::now(), text),
    }
}

/// Archive bot over an in-memory store and a Bot API transport that never touches the network.
pub async fn archive_bot(
    admin_user_ids: Vec<i64>,
) -> (ArchiveBot, ArchiveStore, mpsc::UnboundedReceiver<ReplyRecord>) {
    let store = ArchiveStore::open("sqlite::memory:")
        .await
        .expect("Failed to open store");
    let transport = BotApiTransport::new(teloxide::Bot::new("dummy_token"));
    let archiver = Archiver::new(
        Arc::new(store.clone()),
        Arc::new(transport.clone()),
        BackfillOptions::default(),
    );
    let (replier, rx) = MockReplier::with_receiver();
    let bot = ArchiveBot::new(archiver, transport, replier, admin_user_ids);
    (bot, store, rx)
}
