//! PostgreSQL notification store.
//!
//! Records live in `notification_records`; channel, priority and status are
//! stored as their wire names.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::notification::Channel;
use crate::postgres::PostgresPool;

use super::backend::{FeedStoreError, NotificationStore};
use super::types::{DeliveryStatus, NotificationRecord};

const RECORD_COLUMNS: &str = "id, event_id, user_id, event_type, channel, priority, title, message, \
     status, error, created_at, read, read_at, related_entity_id, related_entity_type";

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: Uuid,
    event_id: Uuid,
    user_id: String,
    event_type: String,
    channel: String,
    priority: String,
    title: String,
    message: String,
    status: String,
    error: Option<String>,
    created_at: DateTime<Utc>,
    read: bool,
    read_at: Option<DateTime<Utc>>,
    related_entity_id: Option<String>,
    related_entity_type: Option<String>,
}

impl TryFrom<RecordRow> for NotificationRecord {
    type Error = FeedStoreError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let corrupt = |reason: String| FeedStoreError::Corrupt { id: row.id, reason };

        let channel = row.channel.parse().map_err(|e| corrupt(format!("{}", e)))?;
        let priority = row.priority.parse().map_err(|e| corrupt(format!("{}", e)))?;
        let status = row.status.parse().map_err(corrupt)?;

        Ok(NotificationRecord {
            id: row.id,
            event_id: row.event_id,
            user_id: row.user_id,
            event_type: row.event_type,
            channel,
            priority,
            title: row.title,
            message: row.message,
            status,
            error: row.error,
            created_at: row.created_at,
            read: row.read,
            read_at: row.read_at,
            related_entity_id: row.related_entity_id,
            related_entity_type: row.related_entity_type,
        })
    }
}

pub struct PostgresNotificationStore {
    pool: Arc<PostgresPool>,
}

impl PostgresNotificationStore {
    pub fn new(pool: Arc<PostgresPool>) -> Self {
        Self { pool }
    }

    fn decode_all(rows: Vec<RecordRow>) -> Result<Vec<NotificationRecord>, FeedStoreError> {
        rows.into_iter().map(NotificationRecord::try_from).collect()
    }
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    fn backend_type(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, record: NotificationRecord) -> Result<(), FeedStoreError> {
        self.pool
            .guarded(
                sqlx::query(
                    r#"
                    INSERT INTO notification_records
                        (id, event_id, user_id, event_type, channel, priority, title, message,
                         status, error, created_at, read, read_at, related_entity_id, related_entity_type)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
                    "#,
                )
                .bind(record.id)
                .bind(record.event_id)
                .bind(&record.user_id)
                .bind(&record.event_type)
                .bind(record.channel.as_str())
                .bind(record.priority.as_str())
                .bind(&record.title)
                .bind(&record.message)
                .bind(record.status.as_str())
                .bind(&record.error)
                .bind(record.created_at)
                .bind(record.read)
                .bind(record.read_at)
                .bind(&record.related_entity_id)
                .bind(&record.related_entity_type)
                .execute(self.pool.pool()),
            )
            .await?;

        tracing::debug!(
            record_id = %record.id,
            event_id = %record.event_id,
            channel = %record.channel,
            "Notification record persisted"
        );
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<NotificationRecord>, FeedStoreError> {
        let sql = format!("SELECT {} FROM notification_records WHERE id = $1", RECORD_COLUMNS);
        let row: Option<RecordRow> = self
            .pool
            .guarded(
                sqlx::query_as(&sql)
                    .bind(id)
                    .fetch_optional(self.pool.pool()),
            )
            .await?;

        row.map(NotificationRecord::try_from).transpose()
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<NotificationRecord>, FeedStoreError> {
        let sql = format!(
            "SELECT {} FROM notification_records WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
            RECORD_COLUMNS
        );
        let rows: Vec<RecordRow> = self
            .pool
            .guarded(
                sqlx::query_as(&sql)
                    .bind(user_id)
                    .fetch_all(self.pool.pool()),
            )
            .await?;

        Self::decode_all(rows)
    }

    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<NotificationRecord>, FeedStoreError> {
        let sql = format!(
            "SELECT {} FROM notification_records WHERE event_id = $1",
            RECORD_COLUMNS
        );
        let rows: Vec<RecordRow> = self
            .pool
            .guarded(
                sqlx::query_as(&sql)
                    .bind(event_id)
                    .fetch_all(self.pool.pool()),
            )
            .await?;

        let mut records = Self::decode_all(rows)?;
        records.sort_by_key(|r| r.channel);
        Ok(records)
    }

    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, FeedStoreError> {
        let result = self
            .pool
            .guarded(
                sqlx::query(
                    r#"
                    UPDATE notification_records
                    SET read = TRUE, read_at = COALESCE(read_at, $2)
                    WHERE id = $1
                    "#,
                )
                .bind(id)
                .bind(at)
                .execute(self.pool.pool()),
            )
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, user_id: &str, at: DateTime<Utc>) -> Result<usize, FeedStoreError> {
        let result = self
            .pool
            .guarded(
                sqlx::query(
                    r#"
                    UPDATE notification_records
                    SET read = TRUE, read_at = COALESCE(read_at, $2)
                    WHERE user_id = $1
                      AND NOT read
                      AND (channel = $3 OR status = $4)
                    "#,
                )
                .bind(user_id)
                .bind(at)
                .bind(Channel::InApp.as_str())
                .bind(DeliveryStatus::Delivered.as_str())
                .execute(self.pool.pool()),
            )
            .await?;

        Ok(result.rows_affected() as usize)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, FeedStoreError> {
        let result = self
            .pool
            .guarded(
                sqlx::query("DELETE FROM notification_records WHERE id = $1")
                    .bind(id)
                    .execute(self.pool.pool()),
            )
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
