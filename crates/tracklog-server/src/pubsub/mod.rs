//! Activity fan-out.
//!
//! Logged activities and refresh requests are published once on a
//! process-wide broadcast channel. Each WebSocket connection holds a receiver
//! and forwards events to its own subscriptions.

mod broadcaster;
mod subscription;

pub use broadcaster::{ActivityBroadcaster, TopicEvent};
pub use subscription::{SubscriptionEntry, SubscriptionSet};
