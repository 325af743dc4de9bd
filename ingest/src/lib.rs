//! # ingest
//!
//! Turns origin messages into archive rows. [`normalizer`] flattens origin entities,
//! [`IngestPipeline`] writes them, [`LiveIngestor`] handles real-time events and
//! [`BackfillController`] walks full chat histories. [`Archiver`] bundles them for the front end.

pub mod archive;
pub mod archiver;
pub mod backfill;
pub mod error;
pub mod in_progress;
pub mod live;
pub mod normalizer;
pub mod pipeline;

pub use archive::MessageArchive;
pub use archiver::Archiver;
pub use backfill::{BackfillController, BackfillOptions, BackfillReport, BackfillRequest};
pub use error::{BackfillError, IngestError};
pub use in_progress::{BackfillGuard, BackfillRegistry};
pub use live::LiveIngestor;
pub use normalizer::{normalize, normalize_at, summarize_chat, NormalizedRecord};
pub use pipeline::{IngestOutcome, IngestPipeline};
