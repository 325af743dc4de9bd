//! Shared ingestion steps for live and backfilled messages: normalize, append, upsert chat.

use std::sync::Arc;

use chatlog_core::{OriginChat, OriginMessage, OriginUser};
use tracing::{debug, error, warn};

use crate::archive::MessageArchive;
use crate::error::IngestError;
use crate::normalizer::normalize;

/// Result of ingesting one message. Never carries a fault the caller must propagate.
#[derive(Debug)]
pub enum IngestOutcome {
    /// Message row appended. `chat_updated` is false when the chat summary write failed.
    Stored { row_id: i64, chat_updated: bool },
    /// Service/administrative message; nothing written.
    Skipped,
    /// The message could not be stored; logged and absorbed.
    Recovered(IngestError),
}

impl IngestOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, IngestOutcome::Stored { .. })
    }
}

#[derive(Clone)]
pub struct IngestPipeline {
    archive: Arc<dyn MessageArchive>,
}

impl IngestPipeline {
    pub fn new(archive: Arc<dyn MessageArchive>) -> Self {
        Self { archive }
    }

    /// Runs normalize → append → upsert chat. Each write is best-effort; the chat summary is
    /// refreshed even when the message append failed.
    pub async fn ingest(
        &self,
        chat: &OriginChat,
        sender: Option<&OriginUser>,
        message: &OriginMessage,
    ) -> IngestOutcome {
        if message.is_service() {
            debug!(chat_id = chat.id(), message_id = message.id, "Skipping service message");
            return IngestOutcome::Skipped;
        }

        let record = normalize(chat, sender, message);

        let appended = self.archive.append_message(&record.message).await;
        if let Err(e) = &appended {
            error!(
                error = %e,
                chat_id = record.message.chat_id,
                message_id = record.message.message_id,
                "Failed to store message"
            );
        }

        let chat_updated = match self.archive.upsert_chat(&record.chat).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, chat_id = record.chat.chat_id, "Failed to update chat summary");
                false
            }
        };

        match appended {
            Ok(row_id) => IngestOutcome::Stored {
                row_id,
                chat_updated,
            },
            Err(e) => IngestOutcome::Recovered(IngestError::Persistence(e)),
        }
    }
}
