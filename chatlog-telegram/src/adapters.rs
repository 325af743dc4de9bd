//! Adapters from Telegram (teloxide) types to origin entities.
//! Depends only on teloxide and chatlog_core type definitions.

use chatlog_core::{
    EventKind, InboundEvent, MediaKind, OriginChat, OriginGroup, OriginMessage, OriginUser,
    ReplyRef, ServiceAction,
};
use teloxide::types::{Chat, Message, MessageKind, User};

/// Converts a teloxide User to [`OriginUser`]. The Bot API hands out no access hash.
pub fn user_to_origin(user: &User) -> OriginUser {
    OriginUser {
        id: user.id.0 as i64,
        username: user.username.clone(),
        first_name: Some(user.first_name.clone()),
        last_name: user.last_name.clone(),
        access_hash: None,
    }
}

/// Private chats become [`OriginChat::Person`]; supergroups and channels are channel-capable groups.
pub fn chat_to_origin(chat: &Chat) -> OriginChat {
    if chat.is_private() {
        return OriginChat::Person(OriginUser {
            id: chat.id.0,
            username: chat.username().map(str::to_string),
            first_name: chat.first_name().map(str::to_string),
            last_name: chat.last_name().map(str::to_string),
            access_hash: None,
        });
    }

    if chat.is_group() || chat.is_supergroup() || chat.is_channel() {
        return OriginChat::Group(OriginGroup {
            id: chat.id.0,
            title: chat.title().map(str::to_string),
            username: chat.username().map(str::to_string),
            participants_count: None,
            access_hash: None,
            broadcast: chat.is_supergroup() || chat.is_channel(),
        });
    }

    OriginChat::Unknown {
        id: Some(chat.id.0),
    }
}

/// Converts a teloxide Message to [`OriginMessage`]: caption stands in for text on media messages.
pub fn message_to_origin(msg: &Message) -> OriginMessage {
    let text = msg.text().or_else(|| msg.caption()).map(str::to_string);

    OriginMessage {
        id: msg.id.0 as i64,
        date: Some(msg.date),
        raw_text: text.clone(),
        text,
        reply_to: msg.reply_to_message().map(|parent| ReplyRef {
            message_id: Some(parent.id.0 as i64),
        }),
        media: media_kind(msg),
        action: service_action(msg),
        views: None,
        forwards: None,
        replies: None,
    }
}

/// Full live event: the chat, the sender (absent for anonymous channel posts) and the message.
pub fn message_to_event(msg: &Message, kind: EventKind) -> InboundEvent {
    InboundEvent {
        kind,
        chat: chat_to_origin(&msg.chat),
        sender: msg.from.as_ref().map(user_to_origin),
        message: message_to_origin(msg),
    }
}

fn media_kind(msg: &Message) -> Option<MediaKind> {
    // Animations also carry a document, so they are checked first.
    if msg.animation().is_some() {
        Some(MediaKind::Animation)
    } else if msg.photo().is_some() {
        Some(MediaKind::Photo)
    } else if msg.video().is_some() {
        Some(MediaKind::Video)
    } else if msg.video_note().is_some() {
        Some(MediaKind::VideoNote)
    } else if msg.voice().is_some() {
        Some(MediaKind::Voice)
    } else if msg.audio().is_some() {
        Some(MediaKind::Audio)
    } else if msg.sticker().is_some() {
        Some(MediaKind::Sticker)
    } else if msg.document().is_some() {
        Some(MediaKind::Document)
    } else if msg.contact().is_some() {
        Some(MediaKind::Contact)
    } else if msg.venue().is_some() {
        Some(MediaKind::Venue)
    } else if msg.location().is_some() {
        Some(MediaKind::Location)
    } else if msg.poll().is_some() {
        Some(MediaKind::Poll)
    } else if msg.dice().is_some() {
        Some(MediaKind::Dice)
    } else if msg.game().is_some() {
        Some(MediaKind::Game)
    } else if msg.invoice().is_some() {
        Some(MediaKind::Invoice)
    } else {
        None
    }
}

fn service_action(msg: &Message) -> Option<ServiceAction> {
    if msg.new_chat_members().is_some() {
        Some(ServiceAction::MembersJoined)
    } else if msg.left_chat_member().is_some() {
        Some(ServiceAction::MemberLeft)
    } else if msg.pinned_message().is_some() {
        Some(ServiceAction::Pinned)
    } else if msg.new_chat_title().is_some() {
        Some(ServiceAction::TitleChanged)
    } else if msg.new_chat_photo().is_some() {
        Some(ServiceAction::PhotoChanged)
    } else if msg.group_chat_created().is_some()
        || msg.super_group_chat_created().is_some()
        || msg.channel_chat_created().is_some()
    {
        Some(ServiceAction::ChatCreated)
    } else if matches!(msg.kind, MessageKind::Common(_)) || msg.dice().is_some() {
        None
    } else {
        Some(ServiceAction::Other("service".to_string()))
    }
}
