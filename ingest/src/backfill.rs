//! Backfill controller: paced oldest-first walk of a chat's full history.
//!
//! One walk per chat id at a time ([`BackfillRegistry`]); walks of different chats run as independent
//! tasks. Rate-limit signals from the transport pause the walk and retry the same request; a
//! self-imposed pause follows every `pause_every` stored messages.

use std::sync::Arc;
use std::time::Duration;

use chatlog_core::{
    ChatTarget, HistoryRequest, OriginChat, OriginMessage, OriginUser, Transport, TransportError,
};
use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::error::BackfillError;
use crate::in_progress::BackfillRegistry;
use crate::normalizer::summarize_chat;
use crate::pipeline::{IngestOutcome, IngestPipeline};

const PROGRESS_LOG_EVERY: u64 = 100;

/// Pacing knobs for history walks.
#[derive(Debug, Clone)]
pub struct BackfillOptions {
    /// Messages requested per history page.
    pub page_size: usize,
    /// Pause after this many stored messages; 0 disables the pause.
    pub pause_every: u64,
    pub pause: Duration,
}

impl Default for BackfillOptions {
    fn default() -> Self {
        Self {
            page_size: 100,
            pause_every: 50,
            pause: Duration::from_secs(1),
        }
    }
}

/// What to walk.
#[derive(Debug, Clone)]
pub struct BackfillRequest {
    pub target: ChatTarget,
    /// Cap on messages pulled from history (service messages included).
    pub limit: Option<usize>,
    /// Only messages dated at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

impl BackfillRequest {
    pub fn new(target: ChatTarget) -> Self {
        Self {
            target,
            limit: None,
            since: None,
        }
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_since(mut self, since: Option<DateTime<Utc>>) -> Self {
        self.since = since;
        self
    }
}

/// Counters of one walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackfillReport {
    pub chat_id: i64,
    pub chat_title: String,
    /// Messages stored.
    pub processed: u64,
    /// Messages that failed to store.
    pub errors: u64,
}

#[derive(Clone)]
pub struct BackfillController {
    transport: Arc<dyn Transport>,
    pipeline: IngestPipeline,
    registry: BackfillRegistry,
    options: BackfillOptions,
}

impl BackfillController {
    pub fn new(
        transport: Arc<dyn Transport>,
        pipeline: IngestPipeline,
        options: BackfillOptions,
    ) -> Self {
        Self {
            transport,
            pipeline,
            registry: BackfillRegistry::new(),
            options,
        }
    }

    pub fn registry(&self) -> &BackfillRegistry {
        &self.registry
    }

    /// Resolves the target and walks its history to the end (or `limit`).
    ///
    /// Only resolution failures, an already running walk on the same chat, and fatal transport
    /// failures mid-walk are returned as errors; per-message failures land in `report.errors`.
    #[instrument(skip(self, request), fields(target = %request.target))]
    pub async fn run(&self, request: &BackfillRequest) -> Result<BackfillReport, BackfillError> {
        let chat = self.resolve(&request.target).await?;
        let summary = summarize_chat(&chat);

        let Some(_guard) = self.registry.try_acquire(summary.chat_id) else {
            warn!(chat_id = summary.chat_id, chat_title = %summary.chat_title, "Backfill already running");
            return Err(BackfillError::AlreadyRunning {
                chat_id: summary.chat_id,
            });
        };

        info!(chat_id = summary.chat_id, chat_title = %summary.chat_title, "step: backfill started");

        let mut report = BackfillReport {
            chat_id: summary.chat_id,
            chat_title: summary.chat_title,
            processed: 0,
            errors: 0,
        };

        match self.walk(&chat, request, &mut report).await {
            Ok(()) => {
                info!(
                    chat_id = report.chat_id,
                    processed = report.processed,
                    errors = report.errors,
                    "step: backfill finished"
                );
                Ok(report)
            }
            Err(TransportError::PermissionDenied(reason)) => {
                error!(
                    chat_id = report.chat_id,
                    reason = %reason,
                    processed = report.processed,
                    "No access to chat history; backfill aborted"
                );
                Err(BackfillError::PermissionDenied { reason, report })
            }
            Err(reason) => {
                error!(
                    chat_id = report.chat_id,
                    error = %reason,
                    processed = report.processed,
                    "Backfill interrupted"
                );
                Err(BackfillError::Interrupted { reason, report })
            }
        }
    }

    async fn resolve(&self, target: &ChatTarget) -> Result<OriginChat, BackfillError> {
        if let ChatTarget::Entity(chat) = target {
            return Ok(chat.clone());
        }

        loop {
            match self.transport.resolve_chat(target).await {
                Ok(chat) => return Ok(chat),
                Err(TransportError::FloodWait { seconds }) => {
                    self.flood_wait(seconds, "resolve_chat").await;
                }
                Err(reason) => {
                    error!(target = %target, error = %reason, "Chat not found");
                    return Err(BackfillError::NotFound {
                        target: target.to_string(),
                        reason,
                    });
                }
            }
        }
    }

    async fn walk(
        &self,
        chat: &OriginChat,
        request: &BackfillRequest,
        report: &mut BackfillReport,
    ) -> Result<(), TransportError> {
        let page_size = self.options.page_size.max(1);
        let mut min_id = 0i64;
        let mut pulled = 0usize;

        loop {
            let page_limit = match request.limit {
                Some(limit) if pulled >= limit => break,
                Some(limit) => page_size.min(limit - pulled),
                None => page_size,
            };

            let history_request = HistoryRequest {
                min_id,
                since: request.since,
                limit: page_limit,
            };

            let page = match self.transport.fetch_history(chat, &history_request).await {
                Ok(page) => page,
                Err(TransportError::FloodWait { seconds }) => {
                    self.flood_wait(seconds, "fetch_history").await;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if page.is_empty() {
                break;
            }

            let previous_min_id = min_id;
            for message in page.iter().take(page_limit) {
                pulled += 1;
                min_id = min_id.max(message.id);
                self.ingest_one(chat, message, report).await;
            }

            if min_id == previous_min_id {
                warn!(chat_id = report.chat_id, min_id, "History page did not advance; stopping");
                break;
            }
        }

        Ok(())
    }

    async fn ingest_one(&self, chat: &OriginChat, message: &OriginMessage, report: &mut BackfillReport) {
        if message.is_service() {
            return;
        }

        let sender = self.resolve_sender(chat, message).await;

        match self.pipeline.ingest(chat, sender.as_ref(), message).await {
            IngestOutcome::Stored { .. } => {
                report.processed += 1;
                if report.processed % PROGRESS_LOG_EVERY == 0 {
                    info!(
                        chat_id = report.chat_id,
                        chat_title = %report.chat_title,
                        processed = report.processed,
                        "Backfill progress"
                    );
                }
                if self.options.pause_every > 0 && report.processed % self.options.pause_every == 0 {
                    tokio::time::sleep(self.options.pause).await;
                }
            }
            IngestOutcome::Skipped => {}
            IngestOutcome::Recovered(e) => {
                report.errors += 1;
                error!(chat_id = report.chat_id, message_id = message.id, error = %e, "Failed to ingest message");
            }
        }
    }

    /// Sender lookup; retried after a rate-limit pause, any other failure degrades to no sender.
    async fn resolve_sender(&self, chat: &OriginChat, message: &OriginMessage) -> Option<OriginUser> {
        loop {
            match self.transport.resolve_sender(chat, message).await {
                Ok(sender) => return sender,
                Err(TransportError::FloodWait { seconds }) => {
                    self.flood_wait(seconds, "resolve_sender").await;
                }
                Err(e) => {
                    debug!(message_id = message.id, error = %e, "Could not resolve sender");
                    return None;
                }
            }
        }
    }

    async fn flood_wait(&self, seconds: u64, request: &str) {
        warn!(seconds, request, "Flood wait: pausing before retry");
        tokio::time::sleep(Duration::from_secs(seconds)).await;
    }
}
