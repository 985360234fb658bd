//! Event intake and delivery audit endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::feed::NotificationRecord;
use crate::metrics::DispatchMetrics;
use crate::notification::{DeliveryReport, EventEnvelope};
use crate::server::AppState;

/// Source tag for events raised over HTTP
pub const HTTP_SOURCE: &str = "http-api";

#[derive(Debug, Serialize)]
pub struct DeliveriesResponse {
    pub event_id: Uuid,
    pub records: Vec<NotificationRecord>,
    pub total: usize,
}

/// POST /api/v1/events - Raise an event and dispatch it
#[tracing::instrument(
    name = "http.raise_event",
    skip(state, envelope),
    fields(event_type = %envelope.event_type, user_id = %envelope.user_id)
)]
pub async fn raise_event(
    State(state): State<AppState>,
    Json(envelope): Json<EventEnvelope>,
) -> Result<Json<DeliveryReport>> {
    let event = envelope
        .into_event(HTTP_SOURCE)
        .inspect_err(|_| DispatchMetrics::record_rejected(HTTP_SOURCE))?;

    let report = state.dispatcher.dispatch(event).await?;
    Ok(Json(report))
}

/// GET /api/v1/events/{event_id}/deliveries - Every record written for an event
#[tracing::instrument(name = "http.event_deliveries", skip(state))]
pub async fn event_deliveries(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<DeliveriesResponse>> {
    let records = state.feed.deliveries(event_id).await?;
    let total = records.len();

    Ok(Json(DeliveriesResponse {
        event_id,
        records,
        total,
    }))
}
