//! Message repository: append-only persistence and queries for archived messages.
//!
//! Uses SqlitePoolManager and the models (NewMessage, MessageRecord, MessageQuery, ArchiveStats).
//! Every append is its own transaction; a failed insert is rolled back and reported to the caller.

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use crate::error::StorageError;
use crate::models::{ArchiveStats, ChatMessageCount, MessageQuery, MessageRecord, NewMessage};
use crate::sqlite_pool::SqlitePoolManager;

#[derive(Clone)]
pub struct MessageRepository {
    pool_manager: SqlitePoolManager,
}

impl MessageRepository {
    /// Wraps a pool and creates the `messages` table and its indexes if missing.
    pub async fn new(pool_manager: SqlitePoolManager) -> Result<Self, StorageError> {
        let repo = Self { pool_manager };
        repo.init().await?;
        Ok(repo)
    }

    async fn init(&self) -> Result<(), StorageError> {
        info!("Creating messages table if not exist");

        let pool = self.pool_manager.pool();

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id INTEGER NOT NULL,
                chat_id INTEGER NOT NULL,
                chat_title TEXT,
                chat_type TEXT NOT NULL,
                user_id INTEGER,
                username TEXT,
                first_name TEXT,
                last_name TEXT,
                message_text TEXT NOT NULL,
                date TEXT NOT NULL,
                is_reply INTEGER NOT NULL DEFAULT 0,
                reply_to_message_id INTEGER,
                has_media INTEGER NOT NULL DEFAULT 0,
                media_type TEXT,
                raw_data TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_messages_chat_id ON messages(chat_id);
            CREATE INDEX IF NOT EXISTS idx_messages_date ON messages(date);
            CREATE INDEX IF NOT EXISTS idx_messages_user_id ON messages(user_id);
            "#,
        )
        .execute(pool)
        .await?;

        info!("Messages table ready");
        Ok(())
    }

    /// Appends one message and returns its surrogate id. Re-appending the same
    /// `(message_id, chat_id)` creates another row.
    #[instrument(skip(self, message), fields(chat_id = message.chat_id, message_id = message.message_id))]
    pub async fn append(&self, message: &NewMessage) -> Result<i64, StorageError> {
        let mut tx = self.pool_manager.pool().begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO messages (
                message_id, chat_id, chat_title, chat_type,
                user_id, username, first_name, last_name,
                message_text, date, is_reply, reply_to_message_id,
                has_media, media_type, raw_data, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(message.message_id)
        .bind(message.chat_id)
        .bind(&message.chat_title)
        .bind(message.chat_type.as_str())
        .bind(message.user_id)
        .bind(&message.username)
        .bind(&message.first_name)
        .bind(&message.last_name)
        .bind(&message.message_text)
        .bind(message.date)
        .bind(message.is_reply)
        .bind(message.reply_to_message_id)
        .bind(message.has_media)
        .bind(&message.media_type)
        .bind(&message.raw_data)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(done) => {
                tx.commit().await?;
                let row_id = done.last_insert_rowid();
                debug!(row_id, "Saved message");
                Ok(row_id)
            }
            Err(e) => {
                error!(error = %e, "Failed to save message, rolling back");
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(e.into())
            }
        }
    }

    /// Number of stored rows, for one chat or across the archive.
    pub async fn count(&self, chat_id: Option<i64>) -> Result<i64, StorageError> {
        let pool = self.pool_manager.pool();

        let count: (i64,) = match chat_id {
            Some(cid) => {
                sqlx::query_as("SELECT COUNT(*) FROM messages WHERE chat_id = ?")
                    .bind(cid)
                    .fetch_one(pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM messages")
                    .fetch_one(pool)
                    .await?
            }
        };

        Ok(count.0)
    }

    /// Lists messages matching the query, ordered by date (ties by insertion order).
    pub async fn query(&self, query: &MessageQuery) -> Result<Vec<MessageRecord>, StorageError> {
        let pool = self.pool_manager.pool();
        let direction = query.order.sql();
        let sql = format!(
            "SELECT * FROM messages \
             WHERE (?1 IS NULL OR chat_id = ?1) AND (?2 IS NULL OR user_id = ?2) \
             ORDER BY date {direction}, id {direction} LIMIT ?3"
        );

        // SQLite treats a negative LIMIT as unbounded.
        let messages: Vec<MessageRecord> = sqlx::query_as::<_, MessageRecord>(&sql)
            .bind(query.chat_id)
            .bind(query.user_id)
            .bind(query.limit.unwrap_or(-1))
            .fetch_all(pool)
            .await?;

        info!(count = messages.len(), chat_id = ?query.chat_id, "Retrieved messages");
        Ok(messages)
    }

    /// Archive-wide statistics; `top` bounds the per-chat ranking.
    pub async fn stats(&self, top: i64) -> Result<ArchiveStats, StorageError> {
        let pool = self.pool_manager.pool();

        let total_messages = self.count(None).await?;

        let total_chats: (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT chat_id) FROM messages")
            .fetch_one(pool)
            .await?;

        let total_users: (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT user_id) FROM messages WHERE user_id IS NOT NULL",
        )
        .fetch_one(pool)
        .await?;

        let top_chats: Vec<ChatMessageCount> = sqlx::query_as(
            r#"
            SELECT chat_id, MAX(chat_title) AS chat_title, COUNT(*) AS count
            FROM messages
            GROUP BY chat_id
            ORDER BY count DESC, chat_id ASC
            LIMIT ?
            "#,
        )
        .bind(top)
        .fetch_all(pool)
        .await?;

        Ok(ArchiveStats {
            total_messages,
            total_chats: total_chats.0,
            total_users: total_users.0,
            top_chats,
        })
    }
}
