//! # courier-realtime
//!
//! The real-time delivery core: an in-memory connection registry mapping
//! user ids to live outbound channels, with per-user queuing for offline
//! recipients, plus the wire event types pushed over SSE.

pub mod events;
pub mod registry;

pub use events::{ChatEvent, MessagePayload};
pub use registry::{ConnectionRegistry, Delivery, Subscription};
