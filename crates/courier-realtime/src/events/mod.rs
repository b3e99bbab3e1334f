//! Wire event types pushed to clients over the SSE stream
//!
//! Each event is serialized as one `data: <json>\n\n` frame. Field names are
//! camelCase on the wire.

use chrono::{DateTime, Utc};
use courier_core::Message;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An event delivered on a user's live stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChatEvent {
    /// Initial acknowledgment after the stream is registered
    Connected {
        #[serde(rename = "userId")]
        user_id: Uuid,
    },
    /// A chat message addressed to the stream's user
    NewMessage { message: MessagePayload },
}

impl ChatEvent {
    /// Create a connected acknowledgment for a user
    #[must_use]
    pub fn connected(user_id: Uuid) -> Self {
        Self::Connected { user_id }
    }

    /// Create a new-message event
    #[must_use]
    pub fn new_message(message: MessagePayload) -> Self {
        Self::NewMessage { message }
    }
}

/// Message body as sent on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub id: Uuid,
    pub conversation_id: String,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&Message> for MessagePayload {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id.clone(),
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            content: message.content.clone(),
            timestamp: message.sent_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_event_wire_format() {
        let user_id = Uuid::new_v4();
        let json = serde_json::to_value(ChatEvent::connected(user_id)).unwrap();

        assert_eq!(json["type"], "connected");
        assert_eq!(json["userId"], user_id.to_string());
    }

    #[test]
    fn test_new_message_event_wire_format() {
        let message = Message::new(
            "conv-1".to_string(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "hello".to_string(),
        );
        let json = serde_json::to_value(ChatEvent::new_message(MessagePayload::from(&message))).unwrap();

        assert_eq!(json["type"], "new-message");
        assert_eq!(json["message"]["conversationId"], "conv-1");
        assert_eq!(json["message"]["content"], "hello");
        assert_eq!(json["message"]["senderId"], message.sender_id.to_string());
    }

    #[test]
    fn test_event_round_trip() {
        let message = Message::new(
            "conv-2".to_string(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            "payload".to_string(),
        );
        let event = ChatEvent::new_message(MessagePayload::from(&message));

        let json = serde_json::to_string(&event).unwrap();
        let parsed: ChatEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
