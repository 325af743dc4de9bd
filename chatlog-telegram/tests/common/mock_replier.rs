//! Mock implementation of [`chatlog_telegram::Replier`] for integration tests.
//!
//! Forwards every reply to a channel so tests can wait for it and assert on the text without
//! hitting Telegram.

use std::sync::Arc;

use async_trait::async_trait;
use chatlog_telegram::Replier;
use tokio::sync::mpsc;

/// One recorded `send_text(chat_id, text)` call.
#[derive(Debug, Clone)]
pub struct ReplyRecord {
    pub chat_id: i64,
    pub text: String,
}

pub struct MockReplier {
    tx: mpsc::UnboundedSender<ReplyRecord>,
}

impl MockReplier {
    /// Creates a MockReplier and returns the receiver for reply records.
    pub fn with_receiver() -> (Arc<Self>, mpsc::UnboundedReceiver<ReplyRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

#[async_trait]
impl Replier for MockReplier {
    async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        let _ = self.tx.send(ReplyRecord {
            chat_id,
            text: text.to_string(),
        });
        Ok(())
    }
}
