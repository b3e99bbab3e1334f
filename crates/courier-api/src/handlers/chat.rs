//! Live chat stream handlers
//!
//! The SSE endpoint registers the user in the connection registry and serves
//! its events as `data: <json>` frames. Stream teardown synchronously
//! releases the registration (only if it is still the active one).

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use courier_realtime::{ChatEvent, ConnectionRegistry, Subscription};
use courier_service::{ActiveUsersResponse, MessageService};
use futures_util::Stream;
use serde::Deserialize;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::response::{ApiError, ApiResult};
use crate::state::AppState;

/// Query parameters for the events stream
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
}

/// Open the live delivery stream for a user
///
/// GET /api/chat/events?userId=
pub async fn events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Sse<ClientEventStream>> {
    let user_id = query
        .user_id
        .ok_or_else(|| ApiError::invalid_query("User ID is required"))?;

    let registry = state.service_context().registry_handle();
    let subscription = registry.open(user_id);
    let stream = ClientEventStream::new(subscription, registry);

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}

/// Best-effort snapshot of connected users
///
/// GET /api/chat/active
pub async fn active(State(state): State<AppState>) -> Json<ActiveUsersResponse> {
    let service = MessageService::new(state.service_context());
    Json(ActiveUsersResponse {
        user_ids: service.active_users(),
    })
}

/// Stream of a user's chat events, deregistering on drop
pub struct ClientEventStream {
    inner: ReceiverStream<ChatEvent>,
    registry: Arc<ConnectionRegistry>,
    user_id: Uuid,
    epoch: u64,
}

impl ClientEventStream {
    fn new(subscription: Subscription, registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            inner: ReceiverStream::new(subscription.receiver),
            registry,
            user_id: subscription.user_id,
            epoch: subscription.epoch,
        }
    }
}

impl Stream for ClientEventStream {
    type Item = Result<Event, axum::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(Event::default().json_data(&event))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ClientEventStream {
    fn drop(&mut self) {
        self.registry.release(self.user_id, self.epoch);
    }
}
