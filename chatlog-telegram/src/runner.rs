//! Dispatcher runner: every new/edited message or channel post is archived through
//! [`ingest::LiveIngestor`]; commands in private chats drive backfills and statistics.

use std::sync::Arc;

use anyhow::Result;
use chatlog_core::{ChatTarget, EventKind, InboundEvent, OriginChat, Transport};
use ingest::{Archiver, IngestOutcome};
use teloxide::prelude::*;
use tracing::{error, info, instrument, warn};

use crate::adapters::message_to_event;
use crate::commands::{
    backfill_reply, help_text, is_authorized, started_reply, stats_reply, Command, StatsLine,
};
use crate::replier::Replier;
use crate::transport::BotApiTransport;

const STATS_TOP_CHATS: usize = 10;

/// Archive bot state shared by all update handlers.
#[derive(Clone)]
pub struct ArchiveBot {
    archiver: Archiver,
    transport: BotApiTransport,
    replier: Arc<dyn Replier>,
    admin_user_ids: Arc<[i64]>,
}

impl ArchiveBot {
    pub fn new(
        archiver: Archiver,
        transport: BotApiTransport,
        replier: Arc<dyn Replier>,
        admin_user_ids: Vec<i64>,
    ) -> Self {
        Self {
            archiver,
            transport,
            replier,
            admin_user_ids: admin_user_ids.into(),
        }
    }

    pub fn archiver(&self) -> &Archiver {
        &self.archiver
    }

    /// Handles one teloxide message or channel post.
    pub async fn handle_message(&self, msg: &Message, kind: EventKind) -> IngestOutcome {
        self.handle_event(message_to_event(msg, kind)).await
    }

    /// Archives the event, then runs it as a command when it is a new message in a private chat.
    /// Commands are archived like any other message.
    pub async fn handle_event(&self, event: InboundEvent) -> IngestOutcome {
        self.transport.observe(event.chat.clone()).await;
        let outcome = self.archiver.live().handle_event(&event).await;

        if event.kind == EventKind::New && matches!(event.chat, OriginChat::Person(_)) {
            let command = event.message.text.as_deref().and_then(Command::parse);
            if let Some(command) = command {
                self.run_command(event.chat.id(), event.sender.as_ref().map(|s| s.id), command)
                    .await;
            }
        }

        outcome
    }

    #[instrument(skip(self, command), fields(command = ?command))]
    async fn run_command(&self, chat_id: i64, user_id: Option<i64>, command: Command) {
        if !is_authorized(&self.admin_user_ids, user_id) {
            warn!(chat_id, user_id, "Command from user outside ADMIN_USER_IDS ignored");
            return;
        }

        match command {
            Command::Parse { target, limit } => {
                let this = self.clone();
                tokio::spawn(async move {
                    this.run_parse(chat_id, target, limit).await;
                });
            }
            Command::ParseUsage => {
                self.reply(chat_id, "Usage: /parse @username [limit=N]").await;
            }
            Command::Stats => {
                let text = match self.stats_text().await {
                    Ok(text) => text,
                    Err(e) => {
                        error!(error = %e, "Failed to collect statistics");
                        format!("❌ Error: {}", e)
                    }
                };
                self.reply(chat_id, &text).await;
            }
            Command::Help => self.reply(chat_id, help_text()).await,
        }
    }

    async fn run_parse(&self, chat_id: i64, target: ChatTarget, limit: Option<usize>) {
        info!(chat_id, target = %target, limit, "step: /parse received");
        self.reply(chat_id, &started_reply(&target)).await;

        let result = self.archiver.start_backfill(target.clone(), limit).await;
        let total = if result.is_ok() {
            self.archiver.total_count(None).await.ok()
        } else {
            None
        };
        self.reply(chat_id, &backfill_reply(&target, &result, total)).await;
    }

    async fn stats_text(&self) -> Result<String> {
        let total = self.archiver.total_count(None).await?;
        let chats = self.archiver.list_chats().await?;

        let mut top = Vec::with_capacity(STATS_TOP_CHATS.min(chats.len()));
        for chat in chats.iter().take(STATS_TOP_CHATS) {
            top.push(StatsLine {
                title: chat.display_title(),
                count: self.archiver.total_count(Some(chat.chat_id)).await?,
            });
        }

        Ok(stats_reply(total, chats.len(), &top))
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.replier.send_text(chat_id, text).await {
            error!(error = %e, chat_id, "Failed to send reply");
        }
    }
}

async fn on_new(msg: Message, archive_bot: Arc<ArchiveBot>) -> ResponseResult<()> {
    archive_bot.handle_message(&msg, EventKind::New).await;
    Ok(())
}

async fn on_edited(msg: Message, archive_bot: Arc<ArchiveBot>) -> ResponseResult<()> {
    archive_bot.handle_message(&msg, EventKind::Edited).await;
    Ok(())
}

/// Logs startup diagnostics, then dispatches updates until Ctrl-C.
#[instrument(skip(bot, archive_bot))]
pub async fn run_dispatcher(bot: teloxide::Bot, archive_bot: Arc<ArchiveBot>) -> Result<()> {
    match archive_bot.archiver.total_count(None).await {
        Ok(count) => info!(stored_messages = count, "Archive opened"),
        Err(e) => error!(error = %e, "Failed to count stored messages"),
    }

    match archive_bot.transport.get_self().await {
        Ok(me) => info!(
            user_id = me.id,
            username = me.username.as_deref().unwrap_or("-"),
            "Connected to Telegram"
        ),
        Err(e) => {
            error!(error = %e, "Failed to identify bot account");
            anyhow::bail!("Failed to connect to Telegram: {}", e);
        }
    }

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(on_new))
        .branch(Update::filter_edited_message().endpoint(on_edited))
        .branch(Update::filter_channel_post().endpoint(on_new))
        .branch(Update::filter_edited_channel_post().endpoint(on_edited));

    info!("Archiver started; listening for messages");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![archive_bot])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Archiver stopped");
    Ok(())
}
