//! [`Transport`] over the Telegram Bot API.
//!
//! The Bot API only reaches chats the bot takes part in and exposes no message history, so chats
//! are resolved from those observed in live traffic and history walks end as a permission failure;
//! full histories go through [`crate::UserAccountTransport`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chatlog_core::{
    ChatTarget, HistoryRequest, OriginChat, OriginMessage, OriginUser, Transport, TransportError,
    TransportResult,
};
use teloxide::prelude::*;
use teloxide::{ApiError, RequestError};
use tokio::sync::RwLock;
use tracing::debug;

use crate::adapters::user_to_origin;

#[derive(Clone)]
pub struct BotApiTransport {
    bot: teloxide::Bot,
    observed: Arc<RwLock<HashMap<i64, OriginChat>>>,
}

impl BotApiTransport {
    pub fn new(bot: teloxide::Bot) -> Self {
        Self {
            bot,
            observed: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Remembers a chat seen in live traffic so it can be targeted later. Newer data replaces older.
    pub async fn observe(&self, chat: OriginChat) {
        let id = chat.id();
        if self.observed.write().await.insert(id, chat).is_none() {
            debug!(chat_id = id, "Observed new chat");
        }
    }
}

fn map_request_error(e: RequestError) -> TransportError {
    match e {
        RequestError::RetryAfter(seconds) => TransportError::FloodWait {
            seconds: seconds.seconds() as u64,
        },
        RequestError::Api(ApiError::ChatNotFound) => TransportError::NotFound(e.to_string()),
        RequestError::Network(_) | RequestError::Io(_) => TransportError::Unavailable(e.to_string()),
        other => TransportError::Other(other.to_string()),
    }
}

#[async_trait]
impl Transport for BotApiTransport {
    async fn resolve_chat(&self, target: &ChatTarget) -> TransportResult<OriginChat> {
        let observed = self.observed.read().await;
        let found = match target {
            ChatTarget::Entity(chat) => return Ok(chat.clone()),
            ChatTarget::Id(id) => observed.get(id).cloned(),
            ChatTarget::Handle(handle) => observed
                .values()
                .find(|chat| {
                    chat.username()
                        .is_some_and(|username| username.eq_ignore_ascii_case(handle))
                })
                .cloned(),
        };
        found.ok_or_else(|| TransportError::NotFound(format!("{} has not been seen by the bot", target)))
    }

    async fn fetch_history(
        &self,
        chat: &OriginChat,
        _request: &HistoryRequest,
    ) -> TransportResult<Vec<OriginMessage>> {
        Err(TransportError::PermissionDenied(format!(
            "the Bot API does not expose message history (chat {})",
            chat.id()
        )))
    }

    /// History is never served, so there is no message whose sender needs a lookup.
    async fn resolve_sender(
        &self,
        _chat: &OriginChat,
        _message: &OriginMessage,
    ) -> TransportResult<Option<OriginUser>> {
        Ok(None)
    }

    async fn get_self(&self) -> TransportResult<OriginUser> {
        let me = self.bot.get_me().await.map_err(map_request_error)?;
        Ok(user_to_origin(&me.user))
    }
}
