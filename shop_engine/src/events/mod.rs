mod event_types;
mod publisher;

pub use event_types::*;
pub use publisher::{EventBroadcaster, EventProducers, EventPublisher};
