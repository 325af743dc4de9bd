//! Storage crate: archive persistence on SQLite.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – NewMessage, MessageRecord, ChatSummary, ChatRecord, MessageQuery, ArchiveStats
//! - [`message_repo`] – MessageRepository (append-only messages)
//! - [`chat_repo`] – ChatRepository (chat registry, upsert keyed by chat_id)
//! - [`sqlite_pool`] – SqlitePoolManager

mod chat_repo;
mod error;
mod message_repo;
mod models;
mod sqlite_pool;

pub use chat_repo::ChatRepository;
pub use error::StorageError;
pub use message_repo::MessageRepository;
pub use models::{
    ArchiveStats, ChatMessageCount, ChatMetadata, ChatRecord, ChatSummary, ChatType,
    MessageQuery, MessageRawData, MessageRecord, NewMessage, SortOrder,
};
pub use sqlite_pool::SqlitePoolManager;

/// Both repositories over one shared connection.
#[derive(Clone)]
pub struct ArchiveStore {
    pub messages: MessageRepository,
    pub chats: ChatRepository,
}

impl ArchiveStore {
    /// Opens (creating if needed) the archive database at `database_url`.
    pub async fn open(database_url: &str) -> Result<Self, StorageError> {
        let pool_manager = SqlitePoolManager::new(database_url).await?;
        let messages = MessageRepository::new(pool_manager.clone()).await?;
        let chats = ChatRepository::new(pool_manager).await?;
        Ok(Self { messages, chats })
    }
}
