//! Message service
//!
//! Sending persists the message best-effort and then hands it to the
//! connection registry: a persistence failure is logged, never surfaced to
//! the sender, and real-time delivery is still attempted.

use courier_core::entities::Message;
use courier_realtime::{ChatEvent, Delivery, MessagePayload};
use tracing::{error, instrument};
use uuid::Uuid;

use crate::dto::SendMessageRequest;

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Default number of messages returned for a conversation history view
pub const HISTORY_LIMIT: i64 = 100;

/// Message service
pub struct MessageService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageService<'a> {
    /// Create a new MessageService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Send a message from the authenticated sender: persist it, then
    /// deliver to the receiver's live channel or queue.
    #[instrument(skip(self, request), fields(sender_id = %sender_id, receiver_id = %request.receiver_id))]
    pub async fn send(
        &self,
        sender_id: Uuid,
        request: SendMessageRequest,
    ) -> ServiceResult<MessagePayload> {
        let message = Message::new(
            request.conversation_id,
            sender_id,
            request.receiver_id,
            request.content,
        );

        // Persistence is best-effort: delivery proceeds either way.
        if let Err(e) = self.ctx.message_repo().create(&message).await {
            error!(
                message_id = %message.id,
                error = %e,
                "Failed to persist message, continuing with delivery"
            );
        }

        let payload = MessagePayload::from(&message);
        let delivery = self
            .ctx
            .registry()
            .deliver(message.receiver_id, ChatEvent::new_message(payload.clone()));

        tracing::debug!(
            message_id = %message.id,
            queued = matches!(delivery, Delivery::Queued),
            "Message dispatched"
        );

        Ok(payload)
    }

    /// Conversation history: the most recent `HISTORY_LIMIT` messages,
    /// returned oldest first for display.
    #[instrument(skip(self))]
    pub async fn history(&self, conversation_id: &str) -> ServiceResult<Vec<MessagePayload>> {
        let mut messages = self
            .ctx
            .message_repo()
            .find_by_conversation(conversation_id, HISTORY_LIMIT)
            .await?;

        // Repository returns newest first; present in chronological order.
        messages.reverse();
        Ok(messages.iter().map(MessagePayload::from).collect())
    }

    /// Best-effort snapshot of user ids with an open live channel
    pub fn active_users(&self) -> Vec<Uuid> {
        self.ctx.registry().list_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceContext;
    use courier_common::{JwtConfig, TokenService};
    use courier_db::{MemoryMessageRepository, MemoryUserRepository};
    use courier_realtime::ConnectionRegistry;
    use std::sync::Arc;

    fn test_context() -> (ServiceContext, Arc<MemoryMessageRepository>) {
        let jwt = JwtConfig {
            access_secret: "test-access-secret-that-is-long-enough".to_string(),
            refresh_secret: "test-refresh-secret-that-is-long-enough".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 604_800,
            leeway: 0,
        };
        let message_repo = Arc::new(MemoryMessageRepository::new());
        let ctx = ServiceContext::new(
            Arc::new(MemoryUserRepository::new()),
            message_repo.clone(),
            Arc::new(TokenService::new(&jwt)),
            ConnectionRegistry::new_shared(),
            None,
        );
        (ctx, message_repo)
    }

    fn send_request(receiver_id: Uuid, content: &str) -> SendMessageRequest {
        SendMessageRequest {
            conversation_id: "conv-1".to_string(),
            receiver_id,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_delivers_to_live_receiver() {
        let (ctx, repo) = test_context();
        let service = MessageService::new(&ctx);
        let sender = Uuid::new_v4();
        let receiver = Uuid::new_v4();

        let mut sub = ctx.registry().open(receiver);
        sub.receiver.recv().await.unwrap(); // connected ack

        let payload = service.send(sender, send_request(receiver, "hi there")).await.unwrap();
        assert_eq!(payload.content, "hi there");
        assert_eq!(repo.len(), 1);

        match sub.receiver.recv().await.unwrap() {
            ChatEvent::NewMessage { message } => {
                assert_eq!(message.id, payload.id);
                assert_eq!(message.sender_id, sender);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_queues_for_offline_receiver() {
        let (ctx, _repo) = test_context();
        let service = MessageService::new(&ctx);
        let receiver = Uuid::new_v4();

        service.send(Uuid::new_v4(), send_request(receiver, "offline")).await.unwrap();
        assert_eq!(ctx.registry().queued_count(receiver), 1);
    }

    #[tokio::test]
    async fn test_history_is_oldest_first() {
        let (ctx, _repo) = test_context();
        let service = MessageService::new(&ctx);
        let sender = Uuid::new_v4();
        let receiver = Uuid::new_v4();

        for i in 0..3 {
            service.send(sender, send_request(receiver, &format!("m{i}"))).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let history = service.history("conv-1").await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "m0");
        assert_eq!(history[2].content, "m2");
    }

    #[tokio::test]
    async fn test_active_users_reflects_registry() {
        let (ctx, _repo) = test_context();
        let service = MessageService::new(&ctx);
        let user = Uuid::new_v4();

        assert!(service.active_users().is_empty());
        let _sub = ctx.registry().open(user);
        assert_eq!(service.active_users(), vec![user]);
    }
}
