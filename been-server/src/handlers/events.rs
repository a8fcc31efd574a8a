use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use been_core::LifecycleEvent;
use been_core::lifecycle::ChannelListener;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, warn};

use crate::infra::app_state::AppState;

/// Streams every lifecycle event for as long as the client stays connected.
///
/// Each connection registers its own channel listener; the bus drops it on
/// the first delivery after the client goes away.
pub async fn lifecycle_events_sse_handler(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let (listener, receiver) = ChannelListener::new();
    let id = state
        .controller()
        .register_event_listener(Arc::new(listener));
    debug!(listener = %id, "lifecycle event stream opened");

    let stream = UnboundedReceiverStream::new(receiver).map(|event| Ok(to_sse(&event)));
    Sse::new(stream).keep_alive(default_keep_alive())
}

fn to_sse(event: &LifecycleEvent) -> Event {
    let frame = Event::default()
        .event(event.kind.to_string())
        .id(event.sequence.to_string());
    match frame.json_data(event) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(sequence = event.sequence, error = %err, "failed to encode lifecycle event");
            Event::default().event("error").data(err.to_string())
        }
    }
}

fn default_keep_alive() -> KeepAlive {
    KeepAlive::new()
        .interval(Duration::from_secs(15))
        .text("keep-alive")
}
