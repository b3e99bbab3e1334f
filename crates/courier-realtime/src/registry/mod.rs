//! Connection registry
//!
//! Routes real-time events to the recipient's live channel, or queues them
//! when the recipient is offline. One live channel per user id; a new
//! registration silently replaces the prior one. All per-user mutations
//! happen under the DashMap shard lock, so replace-then-flush is atomic with
//! respect to concurrent delivers for the same id.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::events::ChatEvent;

/// Buffer size of each live channel. Must exceed the queue capacity so a
/// backlog flush on open always fits before the receiver is first polled.
pub const CHANNEL_CAPACITY: usize = 512;

/// Maximum queued events per offline user; the oldest event is dropped once
/// the cap is reached.
pub const QUEUE_CAPACITY: usize = 256;

/// Outcome of a delivery attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to a live channel
    Sent,
    /// No usable live channel; appended to the user's queue
    Queued,
}

/// A live registration handed to the stream that serves it
///
/// `epoch` identifies this registration so a replaced stream's teardown
/// cannot deregister its successor.
pub struct Subscription {
    pub user_id: Uuid,
    pub epoch: u64,
    pub receiver: mpsc::Receiver<ChatEvent>,
}

struct LiveChannel {
    epoch: u64,
    sender: mpsc::Sender<ChatEvent>,
}

#[derive(Default)]
struct UserSlot {
    channel: Option<LiveChannel>,
    queue: VecDeque<ChatEvent>,
}

impl UserSlot {
    fn enqueue(&mut self, user_id: Uuid, event: ChatEvent) {
        if self.queue.len() >= QUEUE_CAPACITY {
            self.queue.pop_front();
            tracing::warn!(
                user_id = %user_id,
                capacity = QUEUE_CAPACITY,
                "Message queue full, dropping oldest event"
            );
        }
        self.queue.push_back(event);
    }

    fn is_empty(&self) -> bool {
        self.channel.is_none() && self.queue.is_empty()
    }
}

/// In-memory registry of live connections and per-user queues
pub struct ConnectionRegistry {
    slots: DashMap<Uuid, UserSlot>,
    epochs: AtomicU64,
}

impl ConnectionRegistry {
    /// Create a new connection registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
            epochs: AtomicU64::new(0),
        }
    }

    /// Create a new connection registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a live channel for a user, replacing any prior one.
    ///
    /// Queued events are flushed FIFO into the new channel, followed by the
    /// `connected` acknowledgment.
    pub fn open(&self, user_id: Uuid) -> Subscription {
        let (sender, receiver) = mpsc::channel(CHANNEL_CAPACITY);
        let epoch = self.epochs.fetch_add(1, Ordering::Relaxed) + 1;

        let mut slot = self.slots.entry(user_id).or_default();
        let backlog = slot.queue.len();
        while let Some(event) = slot.queue.pop_front() {
            // Capacity covers a full queue; the receiver has not been polled yet.
            let _ = sender.try_send(event);
        }
        let _ = sender.try_send(ChatEvent::connected(user_id));
        slot.channel = Some(LiveChannel {
            epoch,
            sender,
        });
        drop(slot);

        tracing::debug!(user_id = %user_id, backlog, "Live channel opened");

        Subscription {
            user_id,
            epoch,
            receiver,
        }
    }

    /// Unregister the live channel for a user. Idempotent: closing twice, or
    /// closing an id with no registration, is a no-op. Queued events are kept
    /// for the next connect.
    pub fn close(&self, user_id: Uuid) {
        if let Some(mut slot) = self.slots.get_mut(&user_id) {
            if slot.channel.take().is_some() {
                tracing::debug!(user_id = %user_id, "Live channel closed");
            }
        }
        self.prune(user_id);
    }

    /// Unregister the channel only if `epoch` is still the active
    /// registration. Used by stream teardown so a replaced connection cannot
    /// evict its replacement.
    pub fn release(&self, user_id: Uuid, epoch: u64) {
        if let Some(mut slot) = self.slots.get_mut(&user_id) {
            if slot.channel.as_ref().is_some_and(|c| c.epoch == epoch) {
                slot.channel = None;
                tracing::debug!(user_id = %user_id, epoch, "Live channel released");
            }
        }
        self.prune(user_id);
    }

    /// Deliver an event to a user: write to the live channel if one exists,
    /// otherwise queue. A failed write means the channel is dead or stalled;
    /// the registration is dropped and the event is queued instead.
    pub fn deliver(&self, user_id: Uuid, event: ChatEvent) -> Delivery {
        let mut slot = self.slots.entry(user_id).or_default();

        if let Some(channel) = slot.channel.take() {
            match channel.sender.try_send(event) {
                Ok(()) => {
                    slot.channel = Some(channel);
                    tracing::trace!(user_id = %user_id, "Event delivered to live channel");
                    return Delivery::Sent;
                }
                Err(TrySendError::Closed(event)) | Err(TrySendError::Full(event)) => {
                    // Registration stays dropped; the channel is dead or stalled.
                    tracing::debug!(
                        user_id = %user_id,
                        "Live channel unusable, dropping registration and queuing"
                    );
                    slot.enqueue(user_id, event);
                    return Delivery::Queued;
                }
            }
        }

        slot.enqueue(user_id, event);
        tracing::trace!(user_id = %user_id, queued = slot.queue.len(), "Event queued for offline user");
        Delivery::Queued
    }

    /// Snapshot of user ids with a live channel. Best-effort: a user can
    /// appear online moments after disconnecting.
    pub fn list_active(&self) -> Vec<Uuid> {
        self.slots
            .iter()
            .filter(|entry| entry.channel.is_some())
            .map(|entry| *entry.key())
            .collect()
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.slots.iter().filter(|e| e.channel.is_some()).count()
    }

    /// Number of events queued for a user
    pub fn queued_count(&self, user_id: Uuid) -> usize {
        self.slots.get(&user_id).map_or(0, |slot| slot.queue.len())
    }

    /// Drop a slot that holds neither a channel nor queued events
    fn prune(&self, user_id: Uuid) {
        self.slots.remove_if(&user_id, |_, slot| slot.is_empty());
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("slots", &self.slots.len())
            .field("connections", &self.connection_count())
            .finish()
    }
}
