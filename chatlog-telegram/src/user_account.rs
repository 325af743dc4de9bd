//! [`Transport`] over a Telegram user account (MTProto, via grammers).
//!
//! A user session can page through the full history of every chat the account belongs to, which
//! the Bot API cannot. Chat ids are reported in Bot API "marked" form (`-id` for basic groups,
//! `-100…` for channels and supergroups) so backfilled rows land next to live ones.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chatlog_core::{
    ChatTarget, HistoryRequest, MediaKind, OriginChat, OriginGroup, OriginMessage, OriginUser,
    ReplyRef, ServiceAction, Transport, TransportError, TransportResult,
};
use chrono::DateTime;
use grammers_client::types::Chat;
use grammers_client::{Client, Config, SignInError};
use grammers_mtsender::InvocationError;
use grammers_session::{PackedChat, PackedType, Session};
use grammers_tl_types as tl;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

use crate::config::UserAccountConfig;

const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// Largest page the server hands out for one history request.
const MAX_HISTORY_PAGE: usize = 100;

#[derive(Clone)]
pub struct UserAccountTransport {
    client: Client,
    me: OriginUser,
    /// Chats seen during resolution, by marked id.
    chats: Arc<RwLock<HashMap<i64, PackedChat>>>,
    /// Senders of the last fetched page, by (chat id, message id).
    senders: Arc<RwLock<HashMap<(i64, i64), OriginUser>>>,
}

impl UserAccountTransport {
    /// Connects with the stored session. Fails when the session has not been authorized yet.
    pub async fn connect(config: &UserAccountConfig) -> Result<Self> {
        let client = open_client(config).await?;
        let authorized = client
            .is_authorized()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to check session authorization: {}", e))?;
        if !authorized {
            anyhow::bail!(
                "Session {} is not authorized; run `chatlog login <phone>` once to create it",
                config.session_file
            );
        }
        save_session(&client, config)?;

        let me = client.get_me().await.map_err(map_invocation_error)?;
        let me = person(&Chat::User(me));
        info!(user_id = me.id, username = ?me.username, "User account session connected");

        Ok(Self {
            client,
            me,
            chats: Arc::new(RwLock::new(HashMap::new())),
            senders: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Walks the dialog list for `id` (marked or bare), remembering every chat on the way.
    async fn find_dialog(&self, id: i64) -> TransportResult<Option<Chat>> {
        let mut dialogs = self.client.iter_dialogs();
        while let Some(dialog) = dialogs.next().await.map_err(map_invocation_error)? {
            let chat = dialog.chat();
            let packed = chat.pack();
            let marked = marked_id(&packed.ty, packed.id);
            self.chats.write().await.insert(marked, packed.clone());
            if marked == id || packed.id == id {
                return Ok(Some(chat.clone()));
            }
        }
        Ok(None)
    }

    async fn packed_chat(&self, chat: &OriginChat) -> TransportResult<PackedChat> {
        if let Some(packed) = self.chats.read().await.get(&chat.id()) {
            return Ok(packed.clone());
        }
        match self.find_dialog(chat.id()).await? {
            Some(found) => Ok(found.pack()),
            None => Err(TransportError::NotFound(format!(
                "chat {} is not among the account's dialogs",
                chat.id()
            ))),
        }
    }
}

/// Interactive first login: requests a code for `phone`, signs in (with the 2FA password when
/// asked) and writes the session file. `prompt` reads one line from the operator.
pub async fn login<F>(config: &UserAccountConfig, phone: &str, mut prompt: F) -> Result<OriginUser>
where
    F: FnMut(&str) -> Result<String>,
{
    let client = open_client(config).await?;
    let authorized = client
        .is_authorized()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to check session authorization: {}", e))?;

    if !authorized {
        let token = client
            .request_login_code(phone)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to request login code: {}", e))?;
        let code = prompt("Login code: ")?;
        match client.sign_in(&token, code.trim()).await {
            Ok(_) => {}
            Err(SignInError::PasswordRequired(password_token)) => {
                let password = prompt("Two-step verification password: ")?;
                client
                    .check_password(password_token, password.trim())
                    .await
                    .map_err(|e| anyhow::anyhow!("Password check failed: {}", e))?;
            }
            Err(e) => anyhow::bail!("Sign-in failed: {}", e),
        }
    }

    save_session(&client, config)?;
    let me = client
        .get_me()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load own profile: {}", e))?;
    Ok(person(&Chat::User(me)))
}

async fn open_client(config: &UserAccountConfig) -> Result<Client> {
    let session = Session::load_file_or_create(&config.session_file)
        .with_context(|| format!("Failed to open session file {}", config.session_file))?;
    Client::connect(Config {
        session,
        api_id: config.api_id,
        api_hash: config.api_hash.clone(),
        params: Default::default(),
    })
    .await
    .map_err(|e| anyhow::anyhow!("Failed to connect to Telegram: {}", e))
}

fn save_session(client: &Client, config: &UserAccountConfig) -> Result<()> {
    client
        .session()
        .save_to_file(&config.session_file)
        .with_context(|| format!("Failed to save session file {}", config.session_file))
}

fn map_invocation_error(e: InvocationError) -> TransportError {
    match e {
        InvocationError::Rpc(rpc) => map_rpc_error(&rpc.name, rpc.value),
        other => TransportError::Unavailable(other.to_string()),
    }
}

/// Maps an RPC error name (`FLOOD_WAIT` with its value, or the unsplit `FLOOD_WAIT_30`).
fn map_rpc_error(name: &str, value: Option<u32>) -> TransportError {
    let (base, value) = match value {
        Some(value) => (name, Some(value)),
        None => match name.rsplit_once('_') {
            Some((base, digits)) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                (base, digits.parse().ok())
            }
            _ => (name, None),
        },
    };

    match base {
        "FLOOD_WAIT" | "FLOOD_PREMIUM_WAIT" | "SLOWMODE_WAIT" => TransportError::FloodWait {
            seconds: u64::from(value.unwrap_or(1)),
        },
        "CHAT_ADMIN_REQUIRED" | "CHANNEL_PRIVATE" | "CHAT_FORBIDDEN" | "CHAT_RESTRICTED"
        | "USER_BANNED_IN_CHANNEL" => TransportError::PermissionDenied(name.to_string()),
        "USERNAME_NOT_OCCUPIED" | "USERNAME_INVALID" | "PEER_ID_INVALID" | "CHANNEL_INVALID"
        | "CHAT_ID_INVALID" => TransportError::NotFound(name.to_string()),
        _ => TransportError::Other(name.to_string()),
    }
}

/// Bot API id of a chat.
fn marked_id(ty: &PackedType, id: i64) -> i64 {
    match ty {
        PackedType::User | PackedType::Bot => id,
        PackedType::Chat => -id,
        _ => -(CHANNEL_ID_OFFSET + id),
    }
}

fn is_channel_capable(ty: &PackedType) -> bool {
    !matches!(ty, PackedType::User | PackedType::Bot | PackedType::Chat)
}

fn person(chat: &Chat) -> OriginUser {
    let packed = chat.pack();
    OriginUser {
        id: packed.id,
        username: chat.username().map(str::to_string),
        first_name: Some(chat.name().to_string()).filter(|n| !n.is_empty()),
        last_name: match chat {
            Chat::User(user) => user.last_name().map(str::to_string),
            _ => None,
        },
        access_hash: packed.access_hash,
    }
}

fn chat_to_origin(chat: &Chat) -> OriginChat {
    if let Chat::User(_) = chat {
        return OriginChat::Person(person(chat));
    }
    let packed = chat.pack();
    OriginChat::Group(OriginGroup {
        id: marked_id(&packed.ty, packed.id),
        title: Some(chat.name().to_string()),
        username: chat.username().map(str::to_string),
        participants_count: None,
        access_hash: packed.access_hash,
        broadcast: is_channel_capable(&packed.ty),
    })
}

/// Request parameters for one oldest-first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HistoryWindow {
    offset_id: i32,
    offset_date: i32,
    add_offset: i32,
    limit: i32,
}

impl HistoryWindow {
    /// A negative `add_offset` turns the server's newest-first slice into the `limit` messages
    /// right after `offset_id` (or after `offset_date` on the first page of a dated walk).
    fn for_request(request: &HistoryRequest) -> Self {
        let limit = request.limit.clamp(1, MAX_HISTORY_PAGE) as i32;
        let (offset_id, offset_date) = match request.since {
            _ if request.min_id > 0 => (clamp_i32(request.min_id + 1), 0),
            Some(since) => (0, clamp_i32(since.timestamp())),
            None => (1, 0),
        };
        Self {
            offset_id,
            offset_date,
            add_offset: -limit,
            limit,
        }
    }
}

fn clamp_i32(value: i64) -> i32 {
    value.clamp(0, i64::from(i32::MAX)) as i32
}

/// Keeps messages past `min_id` and not older than `since`, oldest first, at most `limit`.
fn finish_page(mut messages: Vec<OriginMessage>, request: &HistoryRequest) -> Vec<OriginMessage> {
    messages.retain(|m| {
        m.id > request.min_id
            && match (request.since, m.date) {
                (Some(since), Some(date)) => date >= since,
                _ => true,
            }
    });
    messages.sort_by_key(|m| m.id);
    messages.dedup_by_key(|m| m.id);
    messages.truncate(request.limit);
    messages
}

fn raw_user(user: &tl::enums::User) -> Option<OriginUser> {
    match user {
        tl::enums::User::User(user) => Some(OriginUser {
            id: user.id,
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            access_hash: user.access_hash,
        }),
        _ => None,
    }
}

fn peer_user(peer: Option<&tl::enums::Peer>) -> Option<i64> {
    match peer {
        Some(tl::enums::Peer::User(user)) => Some(user.user_id),
        _ => None,
    }
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

/// Who sent a raw message: the author peer, else the account itself for outgoing messages,
/// else the counterpart of a private chat.
enum SenderRef {
    User(i64),
    Me,
}

fn raw_message(raw: &tl::enums::Message) -> Option<(OriginMessage, Option<SenderRef>)> {
    match raw {
        tl::enums::Message::Message(m) => {
            let sender = match peer_user(m.from_id.as_ref()) {
                Some(id) => Some(SenderRef::User(id)),
                None if m.out => Some(SenderRef::Me),
                None => peer_user(Some(&m.peer_id)).map(SenderRef::User),
            };
            let text = non_empty(&m.message);
            let message = OriginMessage {
                id: i64::from(m.id),
                date: DateTime::from_timestamp(i64::from(m.date), 0),
                raw_text: text.clone(),
                text,
                reply_to: reply_ref(m.reply_to.as_ref()),
                media: m.media.as_ref().and_then(media_kind),
                action: None,
                views: m.views.map(i64::from),
                forwards: m.forwards.map(i64::from),
                replies: m.replies.as_ref().map(reply_count),
            };
            Some((message, sender))
        }
        tl::enums::Message::Service(m) => {
            let message = OriginMessage {
                id: i64::from(m.id),
                date: DateTime::from_timestamp(i64::from(m.date), 0),
                text: None,
                raw_text: None,
                reply_to: None,
                media: None,
                action: Some(service_action(&m.action)),
                views: None,
                forwards: None,
                replies: None,
            };
            Some((message, peer_user(m.from_id.as_ref()).map(SenderRef::User)))
        }
        _ => None,
    }
}

fn reply_ref(reply: Option<&tl::enums::MessageReplyHeader>) -> Option<ReplyRef> {
    match reply {
        Some(tl::enums::MessageReplyHeader::Header(header)) => Some(ReplyRef {
            message_id: header.reply_to_msg_id.map(i64::from),
        }),
        _ => None,
    }
}

#[allow(unreachable_patterns)]
fn reply_count(replies: &tl::enums::MessageReplies) -> i64 {
    match replies {
        tl::enums::MessageReplies::Replies(replies) => i64::from(replies.replies),
        _ => 0,
    }
}

fn media_kind(media: &tl::enums::MessageMedia) -> Option<MediaKind> {
    use tl::enums::MessageMedia as Media;

    let kind = match media {
        Media::Empty { .. } => return None,
        Media::Photo { .. } => MediaKind::Photo,
        Media::Document(document) => document_kind(document),
        Media::Geo { .. } | Media::GeoLive { .. } => MediaKind::Location,
        Media::Venue { .. } => MediaKind::Venue,
        Media::Contact { .. } => MediaKind::Contact,
        Media::Poll { .. } => MediaKind::Poll,
        Media::Dice { .. } => MediaKind::Dice,
        Media::Game { .. } => MediaKind::Game,
        Media::Invoice { .. } => MediaKind::Invoice,
        Media::WebPage { .. } => MediaKind::WebPage,
        _ => MediaKind::Other("unsupported".to_string()),
    };
    Some(kind)
}

fn document_kind(media: &tl::types::MessageMediaDocument) -> MediaKind {
    use tl::enums::DocumentAttribute as Attribute;

    let Some(tl::enums::Document::Document(document)) = &media.document else {
        return MediaKind::Document;
    };

    let mut kind = MediaKind::Document;
    for attribute in &document.attributes {
        match attribute {
            Attribute::Animated { .. } => return MediaKind::Animation,
            Attribute::Sticker { .. } => return MediaKind::Sticker,
            Attribute::Video(video) if video.round_message => kind = MediaKind::VideoNote,
            Attribute::Video { .. } => kind = MediaKind::Video,
            Attribute::Audio(audio) if audio.voice => kind = MediaKind::Voice,
            Attribute::Audio { .. } => kind = MediaKind::Audio,
            _ => {}
        }
    }
    kind
}

fn service_action(action: &tl::enums::MessageAction) -> ServiceAction {
    use tl::enums::MessageAction as Action;

    match action {
        Action::ChatAddUser { .. } | Action::ChatJoinedByLink { .. } | Action::ChatJoinedByRequest { .. } => {
            ServiceAction::MembersJoined
        }
        Action::ChatDeleteUser { .. } => ServiceAction::MemberLeft,
        Action::PinMessage { .. } => ServiceAction::Pinned,
        Action::ChatEditTitle { .. } => ServiceAction::TitleChanged,
        Action::ChatEditPhoto { .. } | Action::ChatDeletePhoto { .. } => ServiceAction::PhotoChanged,
        Action::ChatCreate { .. } | Action::ChannelCreate { .. } => ServiceAction::ChatCreated,
        Action::ChatMigrateTo { .. } | Action::ChannelMigrateFrom { .. } => ServiceAction::Migrated,
        _ => ServiceAction::Other("service".to_string()),
    }
}

#[async_trait]
impl Transport for UserAccountTransport {
    async fn resolve_chat(&self, target: &ChatTarget) -> TransportResult<OriginChat> {
        let found = match target {
            ChatTarget::Entity(chat) => return Ok(chat.clone()),
            ChatTarget::Handle(handle) => self
                .client
                .resolve_username(handle)
                .await
                .map_err(map_invocation_error)?,
            ChatTarget::Id(id) => self.find_dialog(*id).await?,
        };

        let chat = found.ok_or_else(|| TransportError::NotFound(format!("{} could not be resolved", target)))?;
        let origin = chat_to_origin(&chat);
        self.chats.write().await.insert(origin.id(), chat.pack());
        Ok(origin)
    }

    #[instrument(skip(self, chat), fields(chat_id = chat.id()))]
    async fn fetch_history(
        &self,
        chat: &OriginChat,
        request: &HistoryRequest,
    ) -> TransportResult<Vec<OriginMessage>> {
        let packed = self.packed_chat(chat).await?;
        let window = HistoryWindow::for_request(request);

        let response = self
            .client
            .invoke(&tl::functions::messages::GetHistory {
                peer: packed.to_input_peer(),
                offset_id: window.offset_id,
                offset_date: window.offset_date,
                add_offset: window.add_offset,
                limit: window.limit,
                max_id: 0,
                min_id: 0,
                hash: 0,
            })
            .await
            .map_err(map_invocation_error)?;

        let (raw_messages, raw_users) = match response {
            tl::enums::messages::Messages::Messages(m) => (m.messages, m.users),
            tl::enums::messages::Messages::Slice(m) => (m.messages, m.users),
            tl::enums::messages::Messages::ChannelMessages(m) => (m.messages, m.users),
            tl::enums::messages::Messages::NotModified { .. } => (Vec::new(), Vec::new()),
        };

        let users: HashMap<i64, OriginUser> = raw_users
            .iter()
            .filter_map(raw_user)
            .map(|user| (user.id, user))
            .collect();

        let mut senders = HashMap::new();
        let mut messages = Vec::with_capacity(raw_messages.len());
        for (message, sender) in raw_messages.iter().filter_map(raw_message) {
            let sender = match sender {
                Some(SenderRef::Me) => Some(self.me.clone()),
                Some(SenderRef::User(id)) => {
                    Some(users.get(&id).cloned().unwrap_or_else(|| OriginUser::new(id)))
                }
                None => None,
            };
            if let Some(sender) = sender {
                senders.insert(message.id, sender);
            }
            messages.push(message);
        }

        let page = finish_page(messages, request);
        debug!(min_id = request.min_id, fetched = page.len(), "History page fetched");

        let chat_id = chat.id();
        let mut cache = self.senders.write().await;
        cache.retain(|(cached_chat, _), _| *cached_chat != chat_id);
        for message in &page {
            if let Some(sender) = senders.remove(&message.id) {
                cache.insert((chat_id, message.id), sender);
            }
        }

        Ok(page)
    }

    /// Served from the users that came with the last history page.
    async fn resolve_sender(
        &self,
        chat: &OriginChat,
        message: &OriginMessage,
    ) -> TransportResult<Option<OriginUser>> {
        Ok(self.senders.write().await.remove(&(chat.id(), message.id)))
    }

    async fn get_self(&self) -> TransportResult<OriginUser> {
        let me = self.client.get_me().await.map_err(map_invocation_error)?;
        Ok(person(&Chat::User(me)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn request(min_id: i64, limit: usize) -> HistoryRequest {
        HistoryRequest {
            min_id,
            since: None,
            limit,
        }
    }

    /// **Test: FLOOD_WAIT carries its delay, split or still suffixed on the name.**
    #[test]
    fn test_flood_wait_maps_to_flood_wait() {
        assert_eq!(
            map_rpc_error("FLOOD_WAIT", Some(31)),
            TransportError::FloodWait { seconds: 31 }
        );
        assert_eq!(
            map_rpc_error("FLOOD_WAIT_12", None),
            TransportError::FloodWait { seconds: 12 }
        );
        assert_eq!(
            map_rpc_error("SLOWMODE_WAIT", Some(5)),
            TransportError::FloodWait { seconds: 5 }
        );
    }

    /// **Test: Missing admin rights and private channels are permission failures.**
    #[test]
    fn test_admin_required_maps_to_permission_denied() {
        assert_eq!(
            map_rpc_error("CHAT_ADMIN_REQUIRED", None),
            TransportError::PermissionDenied("CHAT_ADMIN_REQUIRED".to_string())
        );
        assert!(matches!(
            map_rpc_error("CHANNEL_PRIVATE", None),
            TransportError::PermissionDenied(_)
        ));
    }

    /// **Test: Unknown usernames and peers are NotFound; anything else is Other.**
    #[test]
    fn test_unresolvable_maps_to_not_found() {
        assert!(matches!(
            map_rpc_error("USERNAME_NOT_OCCUPIED", None),
            TransportError::NotFound(_)
        ));
        assert!(matches!(
            map_rpc_error("PEER_ID_INVALID", None),
            TransportError::NotFound(_)
        ));
        assert_eq!(
            map_rpc_error("MSG_ID_INVALID", None),
            TransportError::Other("MSG_ID_INVALID".to_string())
        );
    }

    /// **Test: Ids are reported in Bot API form per chat kind.**
    #[test]
    fn test_marked_ids() {
        assert_eq!(marked_id(&PackedType::User, 42), 42);
        assert_eq!(marked_id(&PackedType::Chat, 55), -55);
        assert_eq!(marked_id(&PackedType::Megagroup, 1234), -1_000_000_001_234);
        assert_eq!(marked_id(&PackedType::Broadcast, 7), -1_000_000_000_007);
        assert!(is_channel_capable(&PackedType::Megagroup));
        assert!(!is_channel_capable(&PackedType::Chat));
    }

    /// **Test: The first page starts at the oldest message, later pages right after min_id.**
    #[test]
    fn test_history_window_walks_forward() {
        let first = HistoryWindow::for_request(&request(0, 100));
        assert_eq!(first.offset_id, 1);
        assert_eq!(first.offset_date, 0);
        assert_eq!(first.add_offset, -100);
        assert_eq!(first.limit, 100);

        let next = HistoryWindow::for_request(&request(250, 500));
        assert_eq!(next.offset_id, 251);
        assert_eq!(next.limit, MAX_HISTORY_PAGE as i32);
        assert_eq!(next.add_offset, -(MAX_HISTORY_PAGE as i32));
    }

    /// **Test: A dated walk starts its first page at the cutoff date.**
    #[test]
    fn test_history_window_since() {
        let since = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let mut dated = request(0, 50);
        dated.since = Some(since);

        let window = HistoryWindow::for_request(&dated);
        assert_eq!(window.offset_id, 0);
        assert_eq!(window.offset_date as i64, since.timestamp());

        dated.min_id = 9;
        assert_eq!(HistoryWindow::for_request(&dated).offset_id, 10);
    }

    /// **Test: A page is filtered past min_id and since, sorted oldest first and capped.**
    #[test]
    fn test_finish_page() {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let messages = vec![
            OriginMessage::text(7, base + Duration::minutes(7), "g"),
            OriginMessage::text(3, base + Duration::minutes(3), "c"),
            OriginMessage::text(5, base + Duration::minutes(5), "e"),
            OriginMessage::text(2, base + Duration::minutes(2), "b"),
            OriginMessage::text(6, base + Duration::minutes(6), "f"),
        ];

        let mut page_request = request(2, 3);
        page_request.since = Some(base + Duration::minutes(4));
        let page = finish_page(messages, &page_request);

        let ids: Vec<i64> = page.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![5, 6, 7]);
    }

    /// **Test: Service actions map to their kinds, migrations included.**
    #[test]
    fn test_service_actions() {
        let title = tl::enums::MessageAction::ChatEditTitle(tl::types::MessageActionChatEditTitle {
            title: "Renamed".to_string(),
        });
        assert_eq!(service_action(&title), ServiceAction::TitleChanged);

        let migrated = tl::enums::MessageAction::ChatMigrateTo(tl::types::MessageActionChatMigrateTo {
            channel_id: 99,
        });
        assert_eq!(service_action(&migrated), ServiceAction::Migrated);
    }
}
