//! Transport abstraction: the remote messaging service the archiver attaches to.
//!
//! [`Transport`] is implementation-agnostic; `chatlog-telegram` provides a teloxide-backed one and
//! tests substitute scripted fakes.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TransportResult;
use crate::types::{OriginChat, OriginMessage, OriginUser};

/// What the caller asked to archive: numeric id, public handle, or an already resolved entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatTarget {
    Id(i64),
    Handle(String),
    Entity(OriginChat),
}

impl ChatTarget {
    /// Parses user input: a (possibly negative) integer is an id, anything else a handle with `@` stripped.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        match input.parse::<i64>() {
            Ok(id) => ChatTarget::Id(id),
            Err(_) => ChatTarget::Handle(input.trim_start_matches('@').to_string()),
        }
    }
}

impl fmt::Display for ChatTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatTarget::Id(id) => write!(f, "{}", id),
            ChatTarget::Handle(handle) => write!(f, "@{}", handle),
            ChatTarget::Entity(chat) => write!(f, "{}", chat.id()),
        }
    }
}

/// One page of history, walking oldest-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    /// Exclusive lower bound on message id; 0 starts from the oldest message.
    pub min_id: i64,
    /// Only messages dated at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Maximum number of messages in the page.
    pub limit: usize,
}

/// Capabilities consumed from the remote service.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Resolves a target to a concrete chat. `TransportError::NotFound` when missing or inaccessible.
    async fn resolve_chat(&self, target: &ChatTarget) -> TransportResult<OriginChat>;

    /// Fetches the next page of history, oldest-first. An empty page means history is exhausted.
    /// May fail with `FloodWait` (retry the same request later) or `PermissionDenied`.
    async fn fetch_history(
        &self,
        chat: &OriginChat,
        request: &HistoryRequest,
    ) -> TransportResult<Vec<OriginMessage>>;

    /// Looks up the sender of a message. `Ok(None)` for anonymous or service senders.
    async fn resolve_sender(
        &self,
        chat: &OriginChat,
        message: &OriginMessage,
    ) -> TransportResult<Option<OriginUser>>;

    /// Identity of the attached account; used for startup diagnostics.
    async fn get_self(&self) -> TransportResult<OriginUser>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_target() {
        assert_eq!(ChatTarget::parse("12345"), ChatTarget::Id(12345));
        assert_eq!(ChatTarget::parse(" -1001234 "), ChatTarget::Id(-1001234));
    }

    #[test]
    fn test_parse_handle_target() {
        assert_eq!(
            ChatTarget::parse("@mygroup"),
            ChatTarget::Handle("mygroup".to_string())
        );
        assert_eq!(
            ChatTarget::parse("support_group"),
            ChatTarget::Handle("support_group".to_string())
        );
    }

    #[test]
    fn test_display_target() {
        assert_eq!(ChatTarget::Handle("abc".to_string()).to_string(), "@abc");
        assert_eq!(ChatTarget::Id(-5).to_string(), "-5");
    }
}
