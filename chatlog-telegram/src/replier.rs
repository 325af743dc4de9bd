//! Outgoing command replies. Production sends through teloxide; tests substitute a recorder.

use async_trait::async_trait;
use teloxide::{prelude::*, types::ChatId};

#[async_trait]
pub trait Replier: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()>;
}

/// Thin wrapper around teloxide::Bot that implements [`Replier`].
#[derive(Clone)]
pub struct TelegramReplier {
    bot: teloxide::Bot,
}

impl TelegramReplier {
    pub fn new(bot: teloxide::Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl Replier for TelegramReplier {
    async fn send_text(&self, chat_id: i64, text: &str) -> anyhow::Result<()> {
        self.bot
            .send_message(ChatId(chat_id), text.to_string())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send reply: {}", e))?;
        Ok(())
    }
}
