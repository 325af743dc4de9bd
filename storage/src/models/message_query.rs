//! Query parameters for listing messages.
//!
//! Used by MessageRepository::query.

use serde::{Deserialize, Serialize};

/// Sort direction on the message `date` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub(crate) fn sql(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageQuery {
    pub chat_id: Option<i64>,
    pub user_id: Option<i64>,
    pub order: SortOrder,
    pub limit: Option<i64>,
}

impl MessageQuery {
    /// All messages of one chat, oldest first.
    pub fn chat(chat_id: i64) -> Self {
        Self {
            chat_id: Some(chat_id),
            order: SortOrder::Ascending,
            ..Self::default()
        }
    }
}
