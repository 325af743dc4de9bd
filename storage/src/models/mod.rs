mod archive_stats;
mod chat_record;
mod message_query;
mod message_record;

pub use archive_stats::{ArchiveStats, ChatMessageCount};
pub use chat_record::{ChatMetadata, ChatRecord, ChatSummary, ChatType};
pub use message_query::{MessageQuery, SortOrder};
pub use message_record::{MessageRawData, MessageRecord, NewMessage};
