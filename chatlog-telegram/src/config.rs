//! Telegram connectivity config: token, optional API URL, command allow-list, and the optional
//! user-account session used for history walks.
//! Loaded from env vars BOT_TOKEN, TELEGRAM_API_URL (or TELOXIDE_API_URL), ADMIN_USER_IDS,
//! API_ID, API_HASH, SESSION_NAME.

use anyhow::Result;
use std::env;
use tracing::error;

/// Telegram access for the archive bot.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub telegram_api_url: Option<String>,
    /// Users allowed to issue commands; empty allows everyone.
    pub admin_user_ids: Vec<i64>,
    /// Present when API_ID and API_HASH are set; history walks then go through the user account.
    pub user_account: Option<UserAccountConfig>,
}

/// MTProto credentials and the on-disk session of the user account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccountConfig {
    pub api_id: i32,
    pub api_hash: String,
    /// Session file path (`<SESSION_NAME>.session`).
    pub session_file: String,
}

impl UserAccountConfig {
    /// Reads API_ID, API_HASH and SESSION_NAME (default `userbot_session`).
    /// `Ok(None)` when API_ID/API_HASH are unset or API_ID is 0.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_vars(
            env::var("API_ID").ok(),
            env::var("API_HASH").ok(),
            env::var("SESSION_NAME").ok(),
        )
    }

    fn from_vars(
        api_id: Option<String>,
        api_hash: Option<String>,
        session_name: Option<String>,
    ) -> Result<Option<Self>> {
        let api_hash = api_hash.map(|h| h.trim().to_string()).unwrap_or_default();
        let api_id = match api_id.as_deref().map(str::trim) {
            None | Some("") => return Ok(None),
            Some(raw) => raw
                .parse::<i32>()
                .map_err(|_| anyhow::anyhow!("API_ID must be an integer, got {:?}", raw))?,
        };
        if api_id == 0 || api_hash.is_empty() {
            return Ok(None);
        }

        let session_name = session_name
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string());

        Ok(Some(Self {
            api_id,
            api_hash,
            session_file: format!("{}.session", session_name),
        }))
    }
}

const DEFAULT_SESSION_NAME: &str = "userbot_session";

impl TelegramConfig {
    /// Loads from env. `token` overrides BOT_TOKEN when given.
    pub fn from_env(token: Option<String>) -> Result<Self> {
        let bot_token = match token {
            Some(token) => token,
            None => env::var("BOT_TOKEN").map_err(|_| anyhow::anyhow!("BOT_TOKEN not set"))?,
        };
        let telegram_api_url = env::var("TELEGRAM_API_URL")
            .or_else(|_| env::var("TELOXIDE_API_URL"))
            .ok();
        let admin_user_ids = env::var("ADMIN_USER_IDS")
            .map(|raw| parse_user_ids(&raw))
            .unwrap_or_default();
        Ok(Self {
            bot_token,
            telegram_api_url,
            admin_user_ids,
            user_account: UserAccountConfig::from_env()?,
        })
    }

    /// Uses the given token, no custom API URL and no allow-list.
    pub fn with_token(bot_token: String) -> Self {
        Self {
            bot_token,
            telegram_api_url: None,
            admin_user_ids: Vec::new(),
            user_account: None,
        }
    }

    /// Fails when TELEGRAM_API_URL is set but not a valid URL.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref url_str) = self.telegram_api_url {
            if reqwest::Url::parse(url_str).is_err() {
                anyhow::bail!(
                    "TELEGRAM_API_URL (or TELOXIDE_API_URL) is set but not a valid URL: {}",
                    url_str
                );
            }
        }
        Ok(())
    }

    /// Builds the teloxide Bot, pointing it at the custom API URL when configured.
    pub fn build_bot(&self) -> teloxide::Bot {
        let bot = teloxide::Bot::new(self.bot_token.clone());
        match self.telegram_api_url {
            Some(ref url_str) => match reqwest::Url::parse(url_str) {
                Ok(url) => bot.set_api_url(url),
                Err(e) => {
                    error!(error = %e, url = %url_str, "Invalid TELEGRAM_API_URL, using default");
                    bot
                }
            },
            None => bot,
        }
    }
}

/// Comma-separated ids; blanks and unparsable entries are dropped.
fn parse_user_ids(raw: &str) -> Vec<i64> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect()
}
