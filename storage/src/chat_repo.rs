//! Chat registry: one summary row per chat, upserted on every observed message.

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::error::StorageError;
use crate::models::{ChatRecord, ChatSummary};
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct ChatRepository {
    pool_manager: SqlitePoolManager,
}

impl ChatRepository {
    /// Wraps a pool and creates the `chats` table if missing.
    pub async fn new(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating chats table if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id INTEGER UNIQUE NOT NULL,
                chat_title TEXT,
                chat_type TEXT NOT NULL,
                participants_count INTEGER,
                first_seen TEXT NOT NULL,
                last_activity TEXT NOT NULL,
                metadata TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chats_last_activity ON chats(last_activity)")
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Inserts or refreshes the row for `chat.chat_id`, stamping `last_activity` with the current
    /// time (returned). `first_seen` keeps the value from the first insert.
    #[instrument(skip(self, chat), fields(chat_id = chat.chat_id))]
    pub async fn upsert(&self, chat: &ChatSummary) -> Result<DateTime<Utc>, StorageError> {
        let metadata = serde_json::to_string(&chat.metadata)?;
        let now = Utc::now();
        let mut tx = self.pool_manager.pool().begin().await?;

        let written = sqlx::query(
            r#"
            INSERT INTO chats (
                chat_id, chat_title, chat_type, participants_count,
                first_seen, last_activity, metadata
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(chat_id) DO UPDATE SET
                chat_title = excluded.chat_title,
                chat_type = excluded.chat_type,
                participants_count = excluded.participants_count,
                last_activity = excluded.last_activity,
                metadata = excluded.metadata
            "#,
        )
        .bind(chat.chat_id)
        .bind(&chat.chat_title)
        .bind(chat.chat_type.as_str())
        .bind(chat.participants_count)
        .bind(now)
        .bind(now)
        .bind(&metadata)
        .execute(&mut *tx)
        .await;

        match written {
            Ok(_) => {
                tx.commit().await?;
                debug!("Chat summary saved");
                Ok(now)
            }
            Err(e) => {
                error!(error = %e, "Failed to save chat, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(e.into())
            }
        }
    }

    pub async fn get(&self, chat_id: i64) -> Result<Option<ChatRecord>, StorageError> {
        let chat = sqlx::query_as::<_, ChatRecord>("SELECT * FROM chats WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_optional(self.pool_manager.pool())
            .await?;

        Ok(chat)
    }

    /// All chats, most recent activity first.
    pub async fn list(&self) -> Result<Vec<ChatRecord>, StorageError> {
        let chats = sqlx::query_as::<_, ChatRecord>(
            "SELECT * FROM chats ORDER BY last_activity DESC, id DESC",
        )
        .fetch_all(self.pool_manager.pool())
        .await?;

        Ok(chats)
    }
}
