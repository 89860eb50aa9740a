//! Server-Sent Events stream of pipeline events
//!
//! Each connection registers as an observer of the broadcast fan-out and
//! receives every event delivered after it connected, in order. When the
//! client goes away its receiver is dropped and the fan-out unregisters it
//! on the next delivery.

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::AppState;

/// GET /events
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let observer = state.observers.register();
    debug!(observer = observer.id, "New SSE client connected");

    let stream = ReceiverStream::new(observer.rx).map(|message| {
        Ok(Event::default()
            .event(message.event_type)
            .data(message.data.as_ref()))
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
