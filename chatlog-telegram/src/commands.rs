//! Private-chat command set: `/parse <target> [limit=N]`, `/stats`, `/help`.
//!
//! Parsing and reply texts only; the runner does the I/O.

use chatlog_core::ChatTarget;
use ingest::{BackfillError, BackfillReport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Walk a chat's history, optionally capped at `limit` messages.
    Parse {
        target: ChatTarget,
        limit: Option<usize>,
    },
    /// `/parse` without a target.
    ParseUsage,
    Stats,
    Help,
}

impl Command {
    /// Parses a command message. `None` for plain text and unknown commands.
    ///
    /// A `@botname` suffix on the command word is ignored, as are `limit=` values that are not numbers.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let word = parts.next()?;
        let word = word.split('@').next().unwrap_or(word);

        match word {
            "/parse" => {
                let Some(target) = parts.next() else {
                    return Some(Command::ParseUsage);
                };
                let limit = parts
                    .filter_map(|part| part.strip_prefix("limit="))
                    .filter_map(|value| value.parse::<usize>().ok())
                    .last();
                Some(Command::Parse {
                    target: ChatTarget::parse(target),
                    limit,
                })
            }
            "/stats" => Some(Command::Stats),
            "/help" | "/start" => Some(Command::Help),
            _ => None,
        }
    }
}

/// Empty allow-list means everyone may issue commands.
pub fn is_authorized(admin_user_ids: &[i64], user_id: Option<i64>) -> bool {
    if admin_user_ids.is_empty() {
        return true;
    }
    user_id.is_some_and(|id| admin_user_ids.contains(&id))
}

pub fn started_reply(target: &ChatTarget) -> String {
    format!(
        "🔄 Started archiving chat: {}\n⏳ This may take a while...",
        target
    )
}

/// Final reply to `/parse`. `total_stored` is the archive-wide count after the walk, when readable.
pub fn backfill_reply(
    target: &ChatTarget,
    result: &Result<BackfillReport, BackfillError>,
    total_stored: Option<i64>,
) -> String {
    match result {
        Ok(report) => {
            let mut text = format!(
                "✅ Archiving finished: {}\n📥 Stored from this chat: {}\n",
                report.chat_title, report.processed
            );
            if report.errors > 0 {
                text.push_str(&format!("⚠️ Failed to store: {}\n", report.errors));
            }
            if let Some(total) = total_stored {
                text.push_str(&format!("📊 Total messages in archive: {}\n", total));
            }
            text.push_str("💾 Use /stats for details");
            text
        }
        Err(BackfillError::NotFound { .. }) => format!(
            "❌ Chat not found: {}\n\nCheck:\n\
             • the handle (for example @groupname)\n\
             • the numeric chat id\n\
             • access to the chat (private chats require membership)",
            target
        ),
        Err(BackfillError::AlreadyRunning { chat_id }) => format!(
            "⏳ Archiving of chat {} is already running. Wait for it to finish.",
            chat_id
        ),
        Err(BackfillError::PermissionDenied { reason, report }) => format!(
            "❌ No access to the message history of {}.\nReason: {}\nStored before stopping: {}",
            report.chat_title, reason, report.processed
        ),
        Err(BackfillError::Interrupted { reason, report }) => format!(
            "❌ Archiving of {} failed: {}\nStored before stopping: {}\nCheck the logs for details.",
            report.chat_title, reason, report.processed
        ),
    }
}

/// One chat in the `/stats` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsLine {
    pub title: String,
    pub count: i64,
}

pub fn stats_reply(total_messages: i64, total_chats: usize, top_chats: &[StatsLine]) -> String {
    let mut text = format!(
        "📊 Archive statistics\n\nTotal messages: {}\nTotal chats: {}\n",
        total_messages, total_chats
    );
    if !top_chats.is_empty() {
        text.push_str("\nRecent chats:\n");
        for line in top_chats {
            text.push_str(&format!("• {}: {} messages\n", line.title, line.count));
        }
    }
    text
}

pub fn help_text() -> &'static str {
    "🤖 Commands:\n\n\
     /parse @username - archive the full history of a chat\n\
     /parse @username limit=1000 - archive at most N messages\n\
     /parse -1001234567890 - archive a chat by id\n\
     /stats - show archive statistics\n\
     /help - show this help\n\n\
     Note: the chat must be reachable by this account."
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatlog_core::TransportError;

    fn report(processed: u64, errors: u64) -> BackfillReport {
        BackfillReport {
            chat_id: -1001,
            chat_title: "Team".to_string(),
            processed,
            errors,
        }
    }

    #[test]
    fn test_parse_with_limit() {
        assert_eq!(
            Command::parse("/parse @mygroup limit=1000"),
            Some(Command::Parse {
                target: ChatTarget::Handle("mygroup".to_string()),
                limit: Some(1000),
            })
        );
    }

    #[test]
    fn test_parse_numeric_target_and_bad_limit() {
        assert_eq!(
            Command::parse("/parse -1001234 limit=abc"),
            Some(Command::Parse {
                target: ChatTarget::Id(-1001234),
                limit: None,
            })
        );
    }

    #[test]
    fn test_parse_without_target() {
        assert_eq!(Command::parse("/parse"), Some(Command::ParseUsage));
    }

    #[test]
    fn test_bot_suffix_and_other_commands() {
        assert_eq!(Command::parse("/stats@chatlog_bot"), Some(Command::Stats));
        assert_eq!(Command::parse("/help"), Some(Command::Help));
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse("/unknown"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_is_authorized() {
        assert!(is_authorized(&[], None));
        assert!(is_authorized(&[7], Some(7)));
        assert!(!is_authorized(&[7], Some(8)));
        assert!(!is_authorized(&[7], None));
    }

    #[test]
    fn test_success_reply_mentions_errors_only_when_present() {
        let target = ChatTarget::parse("@team");

        let clean = backfill_reply(&target, &Ok(report(5, 0)), Some(42));
        assert!(clean.contains("Stored from this chat: 5"));
        assert!(clean.contains("Total messages in archive: 42"));
        assert!(!clean.contains("Failed to store"));

        let with_errors = backfill_reply(&target, &Ok(report(5, 2)), None);
        assert!(with_errors.contains("Failed to store: 2"));
    }

    #[test]
    fn test_failure_replies_are_distinct() {
        let target = ChatTarget::parse("@team");

        let not_found = backfill_reply(
            &target,
            &Err(BackfillError::NotFound {
                target: "@team".to_string(),
                reason: TransportError::NotFound("@team".to_string()),
            }),
            None,
        );
        assert!(not_found.contains("Chat not found: @team"));

        let running = backfill_reply(
            &target,
            &Err(BackfillError::AlreadyRunning { chat_id: -1001 }),
            None,
        );
        assert!(running.contains("already running"));

        let denied = backfill_reply(
            &target,
            &Err(BackfillError::PermissionDenied {
                reason: "private".to_string(),
                report: report(3, 0),
            }),
            None,
        );
        assert!(denied.contains("No access"));
        assert!(denied.contains("Stored before stopping: 3"));

        let interrupted = backfill_reply(
            &target,
            &Err(BackfillError::Interrupted {
                reason: TransportError::Unavailable("connection reset".to_string()),
                report: report(1, 0),
            }),
            None,
        );
        assert!(interrupted.contains("failed"));
    }

    #[test]
    fn test_stats_reply() {
        let text = stats_reply(
            12,
            2,
            &[
                StatsLine { title: "Team".to_string(), count: 10 },
                StatsLine { title: "Alice".to_string(), count: 2 },
            ],
        );
        assert!(text.contains("Total messages: 12"));
        assert!(text.contains("Total chats: 2"));
        assert!(text.contains("• Team: 10 messages"));
    }
}
