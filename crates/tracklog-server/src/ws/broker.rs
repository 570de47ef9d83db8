//! Frame handling for an admitted logical session.
//!
//! Receives frames that already passed [`ChannelSession`](crate::auth::ChannelSession)
//! and produces the frames to write back. Broadcast policy is a single shared
//! topic: [`ACTIVITY_TOPIC`] receives a snapshot of recent activities on
//! subscribe, every newly logged activity afterwards, and a fresh snapshot
//! whenever any client sends to [`ACTIVITY_SEND_DESTINATION`].

use std::sync::Arc;

use tracklog_core::Identity;
use tracklog_proto::{headers, Command, Frame, ACTIVITY_SEND_DESTINATION, ACTIVITY_TOPIC};

use crate::activity::ActivityStore;
use crate::pubsub::{ActivityBroadcaster, SubscriptionSet, TopicEvent};
use crate::state::AppState;

/// Frames to write back, and whether to close afterwards.
#[derive(Debug, Default, PartialEq)]
pub struct Dispatch {
    pub replies: Vec<Frame>,
    pub close: bool,
}

impl Dispatch {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn reply(frame: Frame) -> Self {
        Self::replies(vec![frame])
    }

    pub fn replies(replies: Vec<Frame>) -> Self {
        Self {
            replies,
            close: false,
        }
    }
}

/// Per-connection message broker.
pub struct ChannelBroker {
    activities: Arc<ActivityStore>,
    broadcaster: ActivityBroadcaster,
    recent_limit: usize,
    subscriptions: SubscriptionSet,
    connection_id: String,
    next_message_id: u64,
}

impl ChannelBroker {
    pub fn new(state: &AppState, connection_id: impl Into<String>) -> Self {
        Self {
            activities: state.activities.clone(),
            broadcaster: state.broadcaster.clone(),
            recent_limit: state.config.recent_limit,
            subscriptions: SubscriptionSet::new(),
            connection_id: connection_id.into(),
            next_message_id: 0,
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Handle a forwarded client frame. `identity` is the session's binding.
    ///
    /// Frames arriving before the session is authenticated are ignored.
    pub fn handle(&mut self, frame: Frame, identity: Option<&Identity>) -> Dispatch {
        let Some(identity) = identity else {
            tracing::debug!(
                connection_id = %self.connection_id,
                frame = %frame,
                "frame before session established ignored"
            );
            self.subscriptions.clear();
            return Dispatch::none();
        };

        let mut dispatch = match frame.command {
            Command::Connect | Command::Stomp => {
                // A new logical session starts without subscriptions.
                self.subscriptions.clear();
                Dispatch::reply(Frame::connected(&identity.subject))
            }
            Command::Subscribe => self.subscribe(&frame),
            Command::Unsubscribe => {
                if let Some(id) = frame.header(headers::ID) {
                    self.subscriptions.remove(id);
                }
                Dispatch::none()
            }
            Command::Send => self.send(&frame, identity),
            Command::Disconnect => Dispatch {
                replies: Vec::new(),
                close: true,
            },
            Command::Ack | Command::Nack | Command::Begin | Command::Commit | Command::Abort => {
                Dispatch::none()
            }
            Command::Connected | Command::Message | Command::Receipt | Command::Error => {
                Dispatch::reply(Frame::error(
                    "Unexpected frame",
                    format!("{} is not a client frame", frame.command),
                ))
            }
        };

        if !frame.command.is_connect() {
            if let Some(receipt) = frame.header(headers::RECEIPT) {
                dispatch.replies.push(Frame::receipt(receipt));
            }
        }
        dispatch
    }

    /// Frames delivering a topic event to this connection's subscriptions.
    pub fn deliver(&mut self, event: &TopicEvent, identity: Option<&Identity>) -> Vec<Frame> {
        if identity.is_none() {
            self.subscriptions.clear();
            return Vec::new();
        }

        let body = match serde_json::to_string(event) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "failed to encode topic event");
                return Vec::new();
            }
        };

        self.subscriptions
            .deliver_to(ACTIVITY_TOPIC)
            .into_iter()
            .map(|subscription| {
                let message_id = self.message_id();
                Frame::message(ACTIVITY_TOPIC, &subscription, &message_id, body.clone())
            })
            .collect()
    }

    fn subscribe(&mut self, frame: &Frame) -> Dispatch {
        let Some(destination) = frame.header(headers::DESTINATION) else {
            return Dispatch::reply(Frame::error("Missing destination", "SUBSCRIBE requires a destination header"));
        };
        if destination != ACTIVITY_TOPIC {
            tracing::debug!(connection_id = %self.connection_id, destination = %destination, "subscribe to unknown destination");
            return Dispatch::reply(Frame::error(
                "Unknown destination",
                format!("No such destination: {}", destination),
            ));
        }

        let id = frame
            .header(headers::ID)
            .map(str::to_string)
            .unwrap_or_else(|| format!("sub-{}", self.subscriptions.len()));
        self.subscriptions.add(&id, destination);

        let snapshot = self.activities.recent(self.recent_limit);
        tracing::debug!(
            connection_id = %self.connection_id,
            subscription = %id,
            snapshot = snapshot.len(),
            "subscribed to activities"
        );

        match serde_json::to_string(&snapshot) {
            Ok(body) => {
                let message_id = self.message_id();
                Dispatch::reply(Frame::message(ACTIVITY_TOPIC, &id, &message_id, body))
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to encode activity snapshot");
                Dispatch::none()
            }
        }
    }

    /// Refresh request: publish the recent activities to every subscriber.
    fn send(&mut self, frame: &Frame, identity: &Identity) -> Dispatch {
        let destination = frame.header(headers::DESTINATION).unwrap_or_default();
        if destination != ACTIVITY_SEND_DESTINATION {
            return Dispatch::reply(Frame::error(
                "Unknown destination",
                format!("No such destination: {}", destination),
            ));
        }

        let recent = self.activities.recent(self.recent_limit);
        tracing::info!(
            connection_id = %self.connection_id,
            subject = %identity.subject,
            count = recent.len(),
            "recent activities requested"
        );
        self.broadcaster.publish_recent(recent);
        Dispatch::none()
    }

    fn message_id(&mut self) -> String {
        let id = format!("{}-{}", self.connection_id, self.next_message_id);
        self.next_message_id += 1;
        id
    }
}
