//! Event polling for the caller's async channel.

use crate::responses::ApiResult;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vizor_async_queries::Event;

/// Query string of the polling endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Last event id the client has seen.
    pub last_id: Option<String>,
}

/// Events newer than `last_id`, oldest first.
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub result: Vec<Event>,
}

/// Creates the async event router.
pub fn router() -> Router<AppState> {
    Router::new().route("/async_event/", get(list_events))
}

/// Reads the channel from the token cookie and returns its pending events.
pub async fn list_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<EventsQuery>,
) -> ApiResult<EventsResponse> {
    let channel_id = state.async_queries.parse_channel_id_from_request(&headers)?;
    let events = state
        .async_queries
        .read_events(&channel_id, query.last_id.as_deref())
        .await?;

    debug!(channel_id = %channel_id, count = events.len(), "Served async events");
    Ok(Json(EventsResponse { result: events }))
}
