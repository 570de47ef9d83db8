//! Process-wide activity broadcast.

use serde::Serialize;
use tokio::sync::broadcast;
use tracklog_proto::ActivityResponse;

/// Payload published on the activity topic.
///
/// Serializes to the `MESSAGE` body: an object for a logged activity, an
/// array for a refresh.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TopicEvent {
    /// A newly logged activity.
    Logged(ActivityResponse),
    /// The most recent activities, newest first.
    Recent(Vec<ActivityResponse>),
}

/// Publishes topic events to every connected channel.
#[derive(Clone)]
pub struct ActivityBroadcaster {
    sender: broadcast::Sender<TopicEvent>,
}

impl ActivityBroadcaster {
    /// Create a broadcaster buffering up to `capacity` undelivered events per receiver.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a logged activity. Returns the number of receivers it was queued for.
    pub fn publish(&self, activity: ActivityResponse) -> usize {
        let activity_id = activity.id;
        let receivers = self.send(TopicEvent::Logged(activity));
        tracing::debug!(activity_id, receivers, "activity broadcast");
        receivers
    }

    /// Publish a refreshed list of recent activities.
    pub fn publish_recent(&self, activities: Vec<ActivityResponse>) -> usize {
        let count = activities.len();
        let receivers = self.send(TopicEvent::Recent(activities));
        tracing::debug!(count, receivers, "recent activities broadcast");
        receivers
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TopicEvent> {
        self.sender.subscribe()
    }

    fn send(&self, event: TopicEvent) -> usize {
        // No receivers is not an error: nobody is connected.
        self.sender.send(event).unwrap_or(0)
    }
}
