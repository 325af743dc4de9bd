//! Scripted [`chatlog_core::Transport`] for backfill tests.
//!
//! Serves history oldest-first from an in-memory list, records every request, and can inject
//! failures per fetch call or per message sender lookup. An optional gate suspends the first
//! history fetch so tests can observe a walk in progress.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chatlog_core::{
    ChatTarget, HistoryRequest, OriginChat, OriginMessage, OriginUser, Transport, TransportError,
    TransportResult,
};
use tokio::sync::Notify;

/// Pair of notifications: `entered` fires when the gated fetch starts, `release` lets it continue.
#[derive(Clone, Default)]
pub struct FetchGate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
pub struct FakeTransport {
    chats: Vec<OriginChat>,
    history: HashMap<i64, Vec<OriginMessage>>,
    senders: HashMap<(i64, i64), OriginUser>,
    /// One entry per fetch call: `None` serves normally, `Some(err)` fails that call.
    fetch_script: Mutex<VecDeque<Option<TransportError>>>,
    sender_failures: Mutex<HashMap<i64, VecDeque<TransportError>>>,
    gate: Mutex<Option<FetchGate>>,
    panic_on_fetch: bool,
    pub fetch_calls: Mutex<Vec<HistoryRequest>>,
    pub sender_calls: Mutex<Vec<i64>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chat(mut self, chat: OriginChat, messages: Vec<OriginMessage>) -> Self {
        self.history.insert(chat.id(), messages);
        self.chats.push(chat);
        self
    }

    pub fn with_sender(mut self, chat_id: i64, message_id: i64, sender: OriginUser) -> Self {
        self.senders.insert((chat_id, message_id), sender);
        self
    }

    pub fn with_fetch_script(self, script: Vec<Option<TransportError>>) -> Self {
        *self.fetch_script.lock().unwrap() = script.into();
        self
    }

    pub fn with_sender_failure(self, message_id: i64, error: TransportError) -> Self {
        self.sender_failures
            .lock()
            .unwrap()
            .entry(message_id)
            .or_default()
            .push_back(error);
        self
    }

    pub fn with_gate(self, gate: FetchGate) -> Self {
        *self.gate.lock().unwrap() = Some(gate);
        self
    }

    pub fn panicking_on_fetch(mut self) -> Self {
        self.panic_on_fetch = true;
        self
    }

    pub fn sender_calls(&self) -> Vec<i64> {
        self.sender_calls.lock().unwrap().clone()
    }

    pub fn fetch_calls(&self) -> Vec<HistoryRequest> {
        self.fetch_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn resolve_chat(&self, target: &ChatTarget) -> TransportResult<OriginChat> {
        let found = self.chats.iter().find(|chat| match target {
            ChatTarget::Id(id) => chat.id() == *id,
            ChatTarget::Handle(handle) => chat.username() == Some(handle.as_str()),
            ChatTarget::Entity(entity) => entity == *chat,
        });
        found
            .cloned()
            .ok_or_else(|| TransportError::NotFound(target.to_string()))
    }

    async fn fetch_history(
        &self,
        chat: &OriginChat,
        request: &HistoryRequest,
    ) -> TransportResult<Vec<OriginMessage>> {
        self.fetch_calls.lock().unwrap().push(request.clone());

        if self.panic_on_fetch {
            panic!("transport crashed");
        }

        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        let scripted = self.fetch_script.lock().unwrap().pop_front().flatten();
        if let Some(error) = scripted {
            return Err(error);
        }

        let messages = self.history.get(&chat.id()).cloned().unwrap_or_default();
        Ok(messages
            .into_iter()
            .filter(|m| m.id > request.min_id)
            .filter(|m| match (request.since, m.date) {
                (Some(since), Some(date)) => date >= since,
                _ => true,
            })
            .take(request.limit)
            .collect())
    }

    async fn resolve_sender(
        &self,
        chat: &OriginChat,
        message: &OriginMessage,
    ) -> TransportResult<Option<OriginUser>> {
        self.sender_calls.lock().unwrap().push(message.id);

        let failure = self
            .sender_failures
            .lock()
            .unwrap()
            .get_mut(&message.id)
            .and_then(|queue| queue.pop_front());
        if let Some(error) = failure {
            return Err(error);
        }

        Ok(self.senders.get(&(chat.id(), message.id)).cloned())
    }

    async fn get_self(&self) -> TransportResult<OriginUser> {
        Ok(OriginUser::new(1))
    }
}
