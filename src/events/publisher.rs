use super::types::DispatchEvent;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::trace;

/// Broadcast publisher for dispatch lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub event: DispatchEvent,
    pub published_at: DateTime<Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to every current subscriber
    pub fn publish(&self, event: DispatchEvent) {
        trace!(event = event.name(), "📣 EVENT: publishing");

        let published = PublishedEvent {
            event,
            published_at: Utc::now(),
        };

        // send() only fails when nobody is subscribed, which is fine for lifecycle events
        let _ = self.sender.send(published);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(crate::constants::defaults::EVENT_CHANNEL_CAPACITY)
    }
}
