//! Server-sent events fan-out.
//!
//! Each connected client gets its own subscription to the [`EventBroadcaster`]. Events are written as
//! `event: <topic>` / `data: <json>` frames. Clients only see events published while they are connected.
use std::convert::Infallible;

use bytes::Bytes;
use log::*;
use shop_engine::events::{EventBroadcaster, ShopEvent};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream,
    StreamExt,
};

pub const SSE_CONTENT_TYPE: &str = "text/event-stream";

pub fn format_event(event: &ShopEvent) -> Bytes {
    Bytes::from(format!("event: {}\ndata: {}\n\n", event.topic(), event.payload()))
}

/// Subscribes to the broadcaster and returns the stream of SSE frames. The first frame is a comment, so that clients
/// know the subscription is live.
pub fn event_stream(broadcaster: &EventBroadcaster) -> impl Stream<Item = Result<Bytes, Infallible>> + 'static {
    let rx = broadcaster.subscribe();
    debug!("📬️ New SSE subscriber. {} connected", broadcaster.subscriber_count());
    let events = BroadcastStream::new(rx).filter_map(|msg| match msg {
        Ok(event) => Some(Ok(format_event(&event))),
        Err(BroadcastStreamRecvError::Lagged(n)) => {
            warn!("📬️ SSE subscriber fell behind and missed {n} events");
            None
        },
    });
    tokio_stream::once(Ok(Bytes::from_static(b": connected\n\n"))).chain(events)
}
