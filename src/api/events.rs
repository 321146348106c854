//! Server-sent change feed.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use tokio::sync::broadcast;

use super::routes::AppState;
use crate::events::ChangeEvent;

/// Encode a change as a named SSE event. Serialization failures are logged and dropped.
fn to_sse(event: &ChangeEvent) -> Option<Event> {
    match Event::default().event(event.event_name()).json_data(event) {
        Ok(sse) => Some(sse),
        Err(e) => {
            tracing::warn!("Dropping unencodable {} event: {}", event.event_name(), e);
            None
        }
    }
}

/// GET /api/events - Every store mutation, as it happens.
pub async fn stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.events.subscribe();
    tracing::debug!(
        subscribers = state.events.subscriber_count(),
        "Change feed client connected"
    );

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("ready").data("{}"));
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    if let Some(sse) = to_sse(&ev) {
                        yield Ok(sse);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    let lagged = ChangeEvent::Error {
                        message: format!("change feed lagged; {} events were dropped", skipped),
                    };
                    if let Some(sse) = to_sse(&lagged) {
                        yield Ok(sse);
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}
