//! Live ingestion: one call per inbound new/edited message event.

use chatlog_core::{EventKind, InboundEvent};
use tracing::{debug, error, instrument};

use crate::pipeline::{IngestOutcome, IngestPipeline};

/// Archives messages as the transport delivers them. No retries; a failed event is logged and dropped.
#[derive(Clone)]
pub struct LiveIngestor {
    pipeline: IngestPipeline,
}

impl LiveIngestor {
    pub fn new(pipeline: IngestPipeline) -> Self {
        Self { pipeline }
    }

    /// Ingests one event. Service events are skipped; edits are appended as new rows.
    #[instrument(skip(self, event), fields(chat_id = event.chat.id(), message_id = event.message.id, kind = ?event.kind))]
    pub async fn handle_event(&self, event: &InboundEvent) -> IngestOutcome {
        let outcome = self
            .pipeline
            .ingest(&event.chat, event.sender.as_ref(), &event.message)
            .await;

        match &outcome {
            IngestOutcome::Stored { row_id, .. } => {
                let who = event
                    .sender
                    .as_ref()
                    .and_then(|s| s.username.clone().or_else(|| s.first_name.clone()))
                    .unwrap_or_else(|| "Unknown".to_string());
                match event.kind {
                    EventKind::New => debug!(row_id, sender = %who, "step: live message saved"),
                    EventKind::Edited => debug!(row_id, sender = %who, "step: edited message saved"),
                }
            }
            IngestOutcome::Skipped => {}
            IngestOutcome::Recovered(e) => {
                error!(error = %e, "Live message dropped");
            }
        }

        outcome
    }
}
