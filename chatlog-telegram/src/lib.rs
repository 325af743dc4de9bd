//! # chatlog-telegram
//!
//! Telegram Bot API front end for the archiver: adapters from teloxide types to origin entities,
//! the private-chat command set, and the dispatcher runner that feeds live updates into
//! [`ingest::LiveIngestor`]. Two [`chatlog_core::Transport`]s: the Bot API one (live chats only)
//! and a user-account one that can walk full chat histories.

mod adapters;
mod commands;
mod config;
mod replier;
mod runner;
mod transport;
mod user_account;

pub use adapters::{chat_to_origin, message_to_event, message_to_origin, user_to_origin};
pub use commands::{
    backfill_reply, help_text, is_authorized, started_reply, stats_reply, Command, StatsLine,
};
pub use config::{TelegramConfig, UserAccountConfig};
pub use replier::{Replier, TelegramReplier};
pub use runner::{run_dispatcher, ArchiveBot};
pub use transport::BotApiTransport;
pub use user_account::{login, UserAccountTransport};
