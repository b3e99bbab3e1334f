//! Message database model

use chrono::{DateTime, Utc};
use courier_core::Message;
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for messages table
#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: Uuid,
    pub conversation_id: String,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl From<MessageModel> for Message {
    fn from(model: MessageModel) -> Self {
        Self {
            id: model.id,
            conversation_id: model.conversation_id,
            sender_id: model.sender_id,
            receiver_id: model.receiver_id,
            content: model.content,
            sent_at: model.sent_at,
            is_deleted: model.is_deleted,
        }
    }
}
