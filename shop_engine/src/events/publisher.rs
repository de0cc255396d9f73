use std::sync::Arc;

use log::*;
use tokio::sync::broadcast;

use crate::events::ShopEvent;

/// A capability for publishing shop events.
///
/// Publishing is fire-and-forget: implementations must not block, and a failure to deliver is never reported back to
/// the caller.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: ShopEvent);
}

/// The publishers that the API objects emit events through. Every event goes to every publisher.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub publishers: Vec<Arc<dyn EventPublisher>>,
}

impl EventProducers {
    pub fn with_publisher<P: EventPublisher + 'static>(mut self, publisher: P) -> Self {
        self.publishers.push(Arc::new(publisher));
        self
    }

    pub fn add_publisher(&mut self, publisher: Arc<dyn EventPublisher>) {
        self.publishers.push(publisher);
    }
}

impl EventPublisher for EventProducers {
    fn publish(&self, event: ShopEvent) {
        trace!("📬️ Publishing {} event", event.topic());
        for publisher in &self.publishers {
            publisher.publish(event.clone());
        }
    }
}

/// Broadcasts every event to all currently connected subscribers.
///
/// There is no persistence and no replay. A subscriber that connects after an event was published never sees it, and
/// a subscriber that falls more than `capacity` events behind misses the oldest ones.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<ShopEvent>,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShopEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EventPublisher for EventBroadcaster {
    fn publish(&self, event: ShopEvent) {
        let topic = event.topic();
        match self.sender.send(event) {
            Ok(n) => trace!("📬️ Broadcast {topic} to {n} subscribers"),
            Err(_) => trace!("📬️ No subscribers for {topic}. Event dropped."),
        }
    }
}
