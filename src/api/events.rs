use super::AppState;
use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::{convert::Infallible, sync::Arc};
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Streams every domain event as it is published, named by its event type.
pub(crate) async fn stream(State(state): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));

    let events = domain_events(BroadcastStream::new(state.events.subscribe()));
    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn domain_events(
    rx: BroadcastStream<crate::core::events::DomainEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    rx.filter_map(|msg| async move {
        match msg {
            Ok(event) => match Event::default().event(event.name()).json_data(&event) {
                Ok(sse) => Some(Ok(sse)),
                Err(e) => {
                    warn!("Failed to encode {} event: {}", event.name(), e);
                    None
                }
            },
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!("Event stream subscriber lagged, skipped {} events", skipped);
                None
            }
        }
    })
}
