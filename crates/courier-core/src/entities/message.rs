//! Message entity - represents a chat message

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Message entity
///
/// Messages are created on send and never mutated afterwards except for the
/// soft-delete flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: String,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    pub is_deleted: bool,
}

impl Message {
    /// Create a new Message
    pub fn new(conversation_id: String, sender_id: Uuid, receiver_id: Uuid, content: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            receiver_id,
            content,
            sent_at: Utc::now(),
            is_deleted: false,
        }
    }

    /// Get a truncated preview of the message (for notifications/logs)
    pub fn preview(&self, max_len: usize) -> &str {
        if self.content.len() <= max_len {
            &self.content
        } else {
            let mut end = max_len;
            while !self.content.is_char_boundary(end) {
                end -= 1;
            }
            &self.content[..end]
        }
    }
}
