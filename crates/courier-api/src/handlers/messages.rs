//! Message handlers

use axum::{
    extract::{Path, State},
    Json,
};
use courier_realtime::MessagePayload;
use courier_service::{MessageHistoryResponse, MessageService, SendMessageRequest};

use crate::extractors::{AuthUser, ValidatedJson};
use crate::response::{ApiError, ApiResult};
use crate::state::AppState;

/// Send a message; the authenticated user is the sender
///
/// POST /api/messages/send
pub async fn send(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(request): ValidatedJson<SendMessageRequest>,
) -> ApiResult<Json<MessagePayload>> {
    let service = MessageService::new(state.service_context());
    let payload = service.send(auth.user_id, request).await?;
    Ok(Json(payload))
}

/// Conversation history, oldest first
///
/// GET /api/messages/:conversation_id
pub async fn history(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(conversation_id): Path<String>,
) -> ApiResult<Json<MessageHistoryResponse>> {
    if conversation_id.trim().is_empty() {
        return Err(ApiError::invalid_query("Conversation ID is required"));
    }

    let service = MessageService::new(state.service_context());
    let data = service.history(&conversation_id).await?;
    let count = data.len();

    Ok(Json(MessageHistoryResponse { data, count }))
}
