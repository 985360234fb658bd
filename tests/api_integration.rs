//! HTTP API integration tests
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; all
//! storage is memory-backed.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use notification_router::channels::ChannelSenders;
use notification_router::config::Settings;
use notification_router::feed::{MemoryNotificationStore, NotificationFeed};
use notification_router::notification::{Channel, Priority};
use notification_router::preferences::{
    NotificationSettings, QuietHours, SettingsStore, SettingsStoreError,
};
use notification_router::server::{create_app, AppState, API_KEY_HEADER};

const API_KEY: &str = "test-key";

fn app() -> Router {
    let mut settings = Settings::default();
    settings.api.key = Some(API_KEY.to_string());
    create_app(AppState::in_memory(settings, ChannelSenders::logging_defaults()))
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(API_KEY_HEADER, API_KEY);

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn seed_in_app_template(app: &Router) {
    let (status, _) = send(
        app,
        request(
            "POST",
            "/api/v1/templates",
            Some(json!({
                "id": "stock-low-in-app",
                "name": "Low stock",
                "event_type": "inventory.low_stock",
                "channels": ["in_app"],
                "subject": "{{sku}} is low",
                "body": "Only {{quantity}} left"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

async fn only_in_app(app: &Router) {
    for channel in ["email", "sms", "push", "slack", "webhook"] {
        let (status, _) = send(
            app,
            request(
                "PUT",
                &format!("/api/v1/settings/inventory.low_stock/channels/{}", channel),
                Some(json!({"enabled": false, "threshold": "low"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_api_key_required() {
    let app = app();

    let req = Request::builder()
        .uri("/api/v1/settings")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // Health stays open
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"]["feed_backend"], "memory");
}

#[tokio::test]
async fn test_event_flows_into_feed() {
    let app = app();
    seed_in_app_template(&app).await;
    only_in_app(&app).await;

    let (status, report) = send(
        &app,
        request(
            "POST",
            "/api/v1/events",
            Some(json!({
                "event_type": "inventory.low_stock",
                "priority": "high",
                "user_id": "user-7",
                "payload": {"sku": "SKU-9", "quantity": 3}
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["suppressed"], false);
    assert_eq!(report["attempts"].as_array().unwrap().len(), 1);
    assert_eq!(report["attempts"][0]["channel"], "in_app");
    assert_eq!(report["attempts"][0]["outcome"], "success");

    let event_id = report["event_id"].as_str().unwrap().to_string();
    let (status, deliveries) = send(
        &app,
        request("GET", &format!("/api/v1/events/{}/deliveries", event_id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deliveries["total"], 1);

    let (status, page) = send(
        &app,
        request("GET", "/api/v1/notifications?user_id=user-7&tab=unread", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["notifications"][0]["title"], "SKU-9 is low");
    assert_eq!(page["notifications"][0]["message"], "Only 3 left");

    let id = page["notifications"][0]["id"].as_str().unwrap().to_string();
    let (status, _) = send(
        &app,
        request("POST", &format!("/api/v1/notifications/{}/read", id), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, stats) = send(
        &app,
        request("GET", "/api/v1/notifications/stats?user_id=user-7", None),
    )
    .await;
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["read"], 1);
    assert_eq!(stats["critical_or_high"], 1);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/api/v1/notifications/{}", id), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/api/v1/notifications/{}", id), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_event_rejected() {
    let app = app();

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/events",
            Some(json!({
                "event_type": "inventory.low_stock",
                "priority": "urgent",
                "user_id": "user-7"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/events",
            Some(json!({
                "event_type": "inventory.low_stock",
                "user_id": "user-7"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_settings_updates() {
    let app = app();

    let (status, settings) = send(
        &app,
        request(
            "PUT",
            "/api/v1/settings/invoices.overdue/channels/sms",
            Some(json!({"enabled": true, "threshold": "critical"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["channels"]["sms"]["threshold"], "critical");

    let (status, settings) = send(
        &app,
        request(
            "PUT",
            "/api/v1/settings/invoices.overdue/quiet-hours",
            Some(json!({"enabled": true, "start": "22:00", "end": "07:00"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["quiet_hours"]["enabled"], true);
    assert_eq!(settings["channels"]["sms"]["enabled"], true);

    let (status, _) = send(
        &app,
        request(
            "PUT",
            "/api/v1/settings/invoices.overdue/channels/fax",
            Some(json!({"enabled": true, "threshold": "low"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            "PUT",
            "/api/v1/settings/invoices.overdue/quiet-hours",
            Some(json!({"enabled": true, "start": "25:00", "end": "07:00"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = send(&app, request("GET", "/api/v1/settings", None)).await;
    assert_eq!(list["total"], 1);
}

#[tokio::test]
async fn test_template_conflict_and_missing() {
    let app = app();
    seed_in_app_template(&app).await;

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/templates",
            Some(json!({
                "id": "stock-low-in-app",
                "name": "Duplicate",
                "event_type": "inventory.low_stock",
                "channels": ["in_app"],
                "subject": "x",
                "body": "y"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (status, _) = send(&app, request("GET", "/api/v1/templates/nope", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, preview) = send(
        &app,
        request(
            "POST",
            "/api/v1/templates/stock-low-in-app/render",
            Some(json!({"payload": {"sku": "A-1", "quantity": 2}})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(preview["subject"], "A-1 is low");
}

struct DownSettings;

#[async_trait]
impl SettingsStore for DownSettings {
    fn backend_type(&self) -> &'static str {
        "down"
    }

    async fn get_settings(&self, _: &str) -> Result<NotificationSettings, SettingsStoreError> {
        Err(SettingsStoreError::Unavailable("circuit open".to_string()))
    }

    async fn update_channel_setting(
        &self,
        _: &str,
        _: Channel,
        _: bool,
        _: Priority,
    ) -> Result<NotificationSettings, SettingsStoreError> {
        Err(SettingsStoreError::Unavailable("circuit open".to_string()))
    }

    async fn update_quiet_hours(
        &self,
        _: &str,
        _: QuietHours,
    ) -> Result<NotificationSettings, SettingsStoreError> {
        Err(SettingsStoreError::Unavailable("circuit open".to_string()))
    }

    async fn list_settings(&self) -> Result<Vec<NotificationSettings>, SettingsStoreError> {
        Err(SettingsStoreError::Unavailable("circuit open".to_string()))
    }
}

#[tokio::test]
async fn test_settings_outage_returns_storage_error() {
    let mut settings = Settings::default();
    settings.api.key = Some(API_KEY.to_string());
    let app = create_app(AppState::from_stores(
        settings,
        Arc::new(DownSettings),
        NotificationFeed::new(Arc::new(MemoryNotificationStore::new())),
        ChannelSenders::logging_defaults(),
    ));

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/events",
            Some(json!({
                "event_type": "invoices.overdue",
                "priority": "critical",
                "user_id": "user-7"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "STORAGE_ERROR");
}
