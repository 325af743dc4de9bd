//! Archiver config: storage location, log file, backfill pacing. Loaded from env.
//!
//! Telegram access (BOT_TOKEN etc.) lives in [`chatlog_telegram::TelegramConfig`] and is only
//! required by `run`.

use std::env;
use std::time::Duration;

use ingest::BackfillOptions;

#[derive(Debug, Clone)]
pub struct ArchiverConfig {
    /// DATABASE_URL
    pub database_url: String,
    /// LOG_FILE
    pub log_file: String,
    /// BACKFILL_PAGE_SIZE, BACKFILL_PAUSE_EVERY, BACKFILL_PAUSE_MS
    pub backfill: BackfillOptions,
}

impl ArchiverConfig {
    /// Loads from env; unset or unparsable values fall back to defaults.
    pub fn load() -> Self {
        let defaults = BackfillOptions::default();
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "file:./chatlog.db".to_string());
        let log_file = env::var("LOG_FILE").unwrap_or_else(|_| "logs/chatlog.log".to_string());

        let backfill = BackfillOptions {
            page_size: env_parse("BACKFILL_PAGE_SIZE").unwrap_or(defaults.page_size),
            pause_every: env_parse("BACKFILL_PAUSE_EVERY").unwrap_or(defaults.pause_every),
            pause: env_parse("BACKFILL_PAUSE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.pause),
        };

        Self {
            database_url,
            log_file,
            backfill,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}
