use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio_stream::wrappers::BroadcastStream;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamFilter {
    pub event_id: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/scans/stream", get(scan_stream))
}

/// GET /v1/scans/stream?event_id=
///
/// One `ticket_scanned` event per processed scan. Slow consumers that lag
/// behind the channel silently miss events.
async fn scan_stream(
    State(state): State<AppState>,
    Query(filter): Query<StreamFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.scan_tx.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let wanted = filter.event_id.clone();
        async move {
            let event = result.ok()?;
            if let Some(wanted) = wanted {
                if event.event_id.as_deref() != Some(wanted.as_str()) {
                    return None;
                }
            }
            Some(Ok(Event::default().event("ticket_scanned").data(event.to_json())))
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
