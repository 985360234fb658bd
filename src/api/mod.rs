//! API layer - HTTP endpoint handlers organized by domain.

mod events;
mod health;
mod metrics;
mod notifications;
mod routes;
mod settings;
mod template;

pub use events::{event_deliveries, raise_event, DeliveriesResponse, HTTP_SOURCE};
pub use health::{health, stats, HealthResponse, StatsResponse};
pub use metrics::prometheus_metrics;
pub use notifications::{
    delete_notification, list_notifications, mark_all_read, mark_read, notification_stats,
    FeedQuery,
};
pub use routes::api_routes;
pub use settings::{get_settings, list_settings, update_channel_setting, update_quiet_hours};
pub use template::{
    create_template, delete_template, get_template, list_templates, render_template_preview,
    update_template,
};
