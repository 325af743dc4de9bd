//! Origin entity types: chats, users and messages as the remote service describes them, before normalization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user account on the remote service (message sender, or the counterpart of a private chat).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginUser {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Transport-specific access credential reference, if the service hands one out.
    pub access_hash: Option<i64>,
}

impl OriginUser {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            username: None,
            first_name: None,
            last_name: None,
            access_hash: None,
        }
    }
}

/// A multi-member entity: basic group, supergroup or broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginGroup {
    pub id: i64,
    pub title: Option<String>,
    pub username: Option<String>,
    pub participants_count: Option<i64>,
    pub access_hash: Option<i64>,
    /// Channel-capable entity (broadcast channels and supergroups); false for basic groups.
    pub broadcast: bool,
}

/// Chat as seen by the transport. Closed set of kinds; normalization matches on the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OriginChat {
    /// One-to-one chat with a person.
    Person(OriginUser),
    /// Group or channel.
    Group(OriginGroup),
    /// Anything the transport could not classify. `id` is absent when not obtainable.
    Unknown { id: Option<i64> },
}

impl OriginChat {
    /// Chat id, or 0 when the entity carries none.
    pub fn id(&self) -> i64 {
        match self {
            OriginChat::Person(user) => user.id,
            OriginChat::Group(group) => group.id,
            OriginChat::Unknown { id } => id.unwrap_or(0),
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            OriginChat::Person(user) => user.username.as_deref(),
            OriginChat::Group(group) => group.username.as_deref(),
            OriginChat::Unknown { .. } => None,
        }
    }

    pub fn access_hash(&self) -> Option<i64> {
        match self {
            OriginChat::Person(user) => user.access_hash,
            OriginChat::Group(group) => group.access_hash,
            OriginChat::Unknown { .. } => None,
        }
    }
}

/// Media payload kind attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    Document,
    Video,
    Audio,
    Voice,
    VideoNote,
    Animation,
    Sticker,
    Contact,
    Location,
    Venue,
    Poll,
    Dice,
    Game,
    Invoice,
    WebPage,
    Other(String),
}

impl MediaKind {
    /// Discriminant tag stored in `media_type`.
    pub fn tag(&self) -> &str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Document => "document",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Voice => "voice",
            MediaKind::VideoNote => "video_note",
            MediaKind::Animation => "animation",
            MediaKind::Sticker => "sticker",
            MediaKind::Contact => "contact",
            MediaKind::Location => "location",
            MediaKind::Venue => "venue",
            MediaKind::Poll => "poll",
            MediaKind::Dice => "dice",
            MediaKind::Game => "game",
            MediaKind::Invoice => "invoice",
            MediaKind::WebPage => "web_page",
            MediaKind::Other(name) => name.as_str(),
        }
    }
}

/// Administrative event carried instead of content (joins, pins, title changes...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceAction {
    MembersJoined,
    MemberLeft,
    Pinned,
    TitleChanged,
    PhotoChanged,
    ChatCreated,
    Migrated,
    Other(String),
}

/// Reference from a reply to its parent. The parent id is not always obtainable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRef {
    pub message_id: Option<i64>,
}

/// A message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginMessage {
    /// Chat-local id assigned by the service.
    pub id: i64,
    pub date: Option<DateTime<Utc>>,
    /// Rendered display text (entities applied).
    pub text: Option<String>,
    /// Raw unrendered text.
    pub raw_text: Option<String>,
    pub reply_to: Option<ReplyRef>,
    pub media: Option<MediaKind>,
    pub action: Option<ServiceAction>,
    pub views: Option<i64>,
    pub forwards: Option<i64>,
    pub replies: Option<i64>,
}

impl OriginMessage {
    /// Plain text message with the given id and date.
    pub fn text(id: i64, date: DateTime<Utc>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id,
            date: Some(date),
            raw_text: Some(text.clone()),
            text: Some(text),
            reply_to: None,
            media: None,
            action: None,
            views: None,
            forwards: None,
            replies: None,
        }
    }

    /// Service/administrative messages carry no content and are not archived.
    pub fn is_service(&self) -> bool {
        self.action.is_some()
    }
}

/// Whether a live event announces a new message or an edit of an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    New,
    Edited,
}

/// One inbound live event: chat context, resolved sender (if any) and message content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub kind: EventKind,
    pub chat: OriginChat,
    pub sender: Option<OriginUser>,
    pub message: OriginMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_chat_without_id_is_zero() {
        assert_eq!(OriginChat::Unknown { id: None }.id(), 0);
        assert_eq!(OriginChat::Unknown { id: Some(7) }.id(), 7);
    }

    #[test]
    fn test_media_tag_other_uses_name() {
        assert_eq!(MediaKind::Photo.tag(), "photo");
        assert_eq!(MediaKind::Other("geo_live".to_string()).tag(), "geo_live");
    }

    #[test]
    fn test_service_detection() {
        let mut msg = OriginMessage::text(1, Utc::now(), "hi");
        assert!(!msg.is_service());
        msg.action = Some(ServiceAction::Pinned);
        assert!(msg.is_service());
    }
}
