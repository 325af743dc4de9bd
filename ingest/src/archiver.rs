//! Archiver: the entry point the command front end talks to. Wires one archive and one transport
//! into live ingestion and the backfill controller.

use std::sync::Arc;

use chatlog_core::{ChatTarget, Transport};
use storage::{ChatRecord, StorageError};

use crate::archive::MessageArchive;
use crate::backfill::{BackfillController, BackfillOptions, BackfillReport, BackfillRequest};
use crate::error::BackfillError;
use crate::live::LiveIngestor;
use crate::pipeline::IngestPipeline;

#[derive(Clone)]
pub struct Archiver {
    archive: Arc<dyn MessageArchive>,
    live: LiveIngestor,
    backfill: BackfillController,
}

impl Archiver {
    pub fn new(
        archive: Arc<dyn MessageArchive>,
        transport: Arc<dyn Transport>,
        options: BackfillOptions,
    ) -> Self {
        let pipeline = IngestPipeline::new(archive.clone());
        Self {
            archive,
            live: LiveIngestor::new(pipeline.clone()),
            backfill: BackfillController::new(transport, pipeline, options),
        }
    }

    pub fn live(&self) -> &LiveIngestor {
        &self.live
    }

    pub fn backfill_controller(&self) -> &BackfillController {
        &self.backfill
    }

    /// Walks the whole history of `target`, optionally capped at `limit` messages.
    pub async fn start_backfill(
        &self,
        target: ChatTarget,
        limit: Option<usize>,
    ) -> Result<BackfillReport, BackfillError> {
        self.backfill
            .run(&BackfillRequest::new(target).with_limit(limit))
            .await
    }

    pub async fn backfill(&self, request: &BackfillRequest) -> Result<BackfillReport, BackfillError> {
        self.backfill.run(request).await
    }

    /// Stored message count for one chat, or across the archive.
    pub async fn total_count(&self, chat_id: Option<i64>) -> Result<i64, StorageError> {
        self.archive.count_messages(chat_id).await
    }

    /// Chat summaries, most recently active first.
    pub async fn list_chats(&self) -> Result<Vec<ChatRecord>, StorageError> {
        self.archive.list_chats().await
    }
}
