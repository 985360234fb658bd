use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::server::{api_key_auth, AppState};

use super::events::{event_deliveries, raise_event};
use super::health::{health, stats};
use super::metrics::prometheus_metrics;
use super::notifications::{
    delete_notification, list_notifications, mark_all_read, mark_read, notification_stats,
};
use super::settings::{get_settings, list_settings, update_channel_setting, update_quiet_hours};
use super::template::{
    create_template, delete_template, get_template, list_templates, render_template_preview,
    update_template,
};

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health & Stats
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/metrics", get(prometheus_metrics))
        .nest(
            "/api/v1",
            Router::new()
                // Events
                .route("/events", post(raise_event))
                .route("/events/{event_id}/deliveries", get(event_deliveries))
                // Routing settings
                .route("/settings", get(list_settings))
                .route("/settings/{event_type}", get(get_settings))
                .route(
                    "/settings/{event_type}/channels/{channel}",
                    put(update_channel_setting),
                )
                .route("/settings/{event_type}/quiet-hours", put(update_quiet_hours))
                // Feed
                .route("/notifications", get(list_notifications))
                .route("/notifications/stats", get(notification_stats))
                .route("/notifications/read-all", post(mark_all_read))
                .route("/notifications/{id}/read", post(mark_read))
                .route(
                    "/notifications/{id}",
                    axum::routing::delete(delete_notification),
                )
                // Templates
                .route("/templates", get(list_templates).post(create_template))
                .route(
                    "/templates/{id}",
                    get(get_template)
                        .put(update_template)
                        .delete(delete_template),
                )
                .route("/templates/{id}/render", post(render_template_preview))
                .route_layer(middleware::from_fn_with_state(state, api_key_auth)),
        )
}
