//! Routing settings administration endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::notification::{Channel, Priority};
use crate::preferences::{parse_time_of_day, NotificationSettings, QuietHours};
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct SettingsListResponse {
    pub settings: Vec<NotificationSettings>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChannelSettingRequest {
    pub enabled: bool,
    /// Priority name, validated strictly
    pub threshold: String,
}

#[derive(Debug, Deserialize)]
pub struct QuietHoursRequest {
    pub enabled: bool,
    /// `HH:MM` or `HH:MM:SS`
    pub start: String,
    pub end: String,
}

/// GET /api/v1/settings - Every configured event type
#[tracing::instrument(name = "http.list_settings", skip(state))]
pub async fn list_settings(State(state): State<AppState>) -> Result<Json<SettingsListResponse>> {
    let settings = state.settings_store.list_settings().await?;
    let total = settings.len();

    Ok(Json(SettingsListResponse { settings, total }))
}

/// GET /api/v1/settings/{event_type} - Settings of one event type (defaults if never set)
#[tracing::instrument(name = "http.get_settings", skip(state))]
pub async fn get_settings(
    State(state): State<AppState>,
    Path(event_type): Path<String>,
) -> Result<Json<NotificationSettings>> {
    let settings = state.settings_store.get_settings(&event_type).await?;
    Ok(Json(settings))
}

/// PUT /api/v1/settings/{event_type}/channels/{channel}
#[tracing::instrument(name = "http.update_channel_setting", skip(state, request))]
pub async fn update_channel_setting(
    State(state): State<AppState>,
    Path((event_type, channel)): Path<(String, String)>,
    Json(request): Json<ChannelSettingRequest>,
) -> Result<Json<NotificationSettings>> {
    let channel: Channel = channel.parse()?;
    let threshold: Priority = request.threshold.parse()?;

    let settings = state
        .settings_store
        .update_channel_setting(&event_type, channel, request.enabled, threshold)
        .await?;

    tracing::info!(
        event_type = %event_type,
        channel = %channel,
        enabled = request.enabled,
        threshold = %threshold,
        "Channel setting updated"
    );
    Ok(Json(settings))
}

/// PUT /api/v1/settings/{event_type}/quiet-hours
#[tracing::instrument(name = "http.update_quiet_hours", skip(state, request))]
pub async fn update_quiet_hours(
    State(state): State<AppState>,
    Path(event_type): Path<String>,
    Json(request): Json<QuietHoursRequest>,
) -> Result<Json<NotificationSettings>> {
    let quiet_hours = QuietHours::new(
        request.enabled,
        parse_time_of_day(&request.start)?,
        parse_time_of_day(&request.end)?,
    );

    let settings = state
        .settings_store
        .update_quiet_hours(&event_type, quiet_hours)
        .await?;

    tracing::info!(
        event_type = %event_type,
        enabled = quiet_hours.enabled,
        start = %quiet_hours.start,
        end = %quiet_hours.end,
        "Quiet hours updated"
    );
    Ok(Json(settings))
}
