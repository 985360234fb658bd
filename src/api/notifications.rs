//! Notification feed endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::feed::{FeedFilter, FeedPage, FeedStats, FeedTab, TimeWindow};
use crate::notification::Priority;
use crate::server::AppState;

/// Page size when the request does not set one
const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub user_id: String,
    pub tab: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub window: Option<String>,
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl FeedQuery {
    fn into_filter(self) -> Result<(String, FeedFilter)> {
        let user_id = require_user(self.user_id)?;

        let filter = FeedFilter {
            tab: self
                .tab
                .as_deref()
                .map(str::parse::<FeedTab>)
                .transpose()?
                .unwrap_or_default(),
            priority: self.priority.as_deref().map(str::parse::<Priority>).transpose()?,
            category: self.category.filter(|c| !c.trim().is_empty()),
            window: self
                .window
                .as_deref()
                .map(str::parse::<TimeWindow>)
                .transpose()?
                .unwrap_or_default(),
            query: self.q.filter(|q| !q.trim().is_empty()),
            limit: Some(self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)),
            offset: self.offset.unwrap_or(0),
        };

        Ok((user_id, filter))
    }
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReadAllRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub id: Uuid,
    pub read: bool,
}

#[derive(Debug, Serialize)]
pub struct ReadAllResponse {
    pub user_id: String,
    pub updated: usize,
}

fn require_user(user_id: String) -> Result<String> {
    if user_id.trim().is_empty() {
        return Err(AppError::Validation("user_id is required".to_string()));
    }
    Ok(user_id)
}

/// GET /api/v1/notifications - Filtered, paginated feed of a user
#[tracing::instrument(name = "http.list_notifications", skip(state, query), fields(user_id = %query.user_id))]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedPage>> {
    let (user_id, filter) = query.into_filter()?;
    let page = state.feed.page(&user_id, &filter).await?;
    Ok(Json(page))
}

/// GET /api/v1/notifications/stats
#[tracing::instrument(name = "http.notification_stats", skip(state))]
pub async fn notification_stats(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<FeedStats>> {
    let user_id = require_user(query.user_id)?;
    Ok(Json(state.feed.stats(&user_id).await?))
}

/// POST /api/v1/notifications/{id}/read
#[tracing::instrument(name = "http.mark_read", skip(state))]
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MarkReadResponse>> {
    if !state.feed.mark_read(id).await? {
        return Err(AppError::NotFound(format!("Notification not found: {}", id)));
    }
    Ok(Json(MarkReadResponse { id, read: true }))
}

/// POST /api/v1/notifications/read-all
#[tracing::instrument(name = "http.mark_all_read", skip(state, request))]
pub async fn mark_all_read(
    State(state): State<AppState>,
    Json(request): Json<ReadAllRequest>,
) -> Result<Json<ReadAllResponse>> {
    let user_id = require_user(request.user_id)?;
    let updated = state.feed.mark_all_read(&user_id).await?;
    Ok(Json(ReadAllResponse { user_id, updated }))
}

/// DELETE /api/v1/notifications/{id}
#[tracing::instrument(name = "http.delete_notification", skip(state))]
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if state.feed.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Notification not found: {}", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_into_filter() {
        let query = FeedQuery {
            user_id: "user-1".to_string(),
            tab: Some("unread".to_string()),
            priority: Some("high".to_string()),
            window: Some("today".to_string()),
            q: Some("  ".to_string()),
            limit: Some(1_000),
            ..FeedQuery::default()
        };

        let (user_id, filter) = query.into_filter().unwrap();
        assert_eq!(user_id, "user-1");
        assert_eq!(filter.tab, FeedTab::Unread);
        assert_eq!(filter.priority, Some(Priority::High));
        assert_eq!(filter.window, TimeWindow::Today);
        assert!(filter.query.is_none());
        assert_eq!(filter.limit, Some(MAX_LIMIT));
    }

    #[test]
    fn test_query_rejects_bad_values() {
        let missing_user = FeedQuery::default();
        assert!(matches!(missing_user.into_filter(), Err(AppError::Validation(_))));

        let bad_priority = FeedQuery {
            user_id: "user-1".to_string(),
            priority: Some("urgent".to_string()),
            ..FeedQuery::default()
        };
        assert!(matches!(bad_priority.into_filter(), Err(AppError::Validation(_))));
    }
}
