//! Backend trait for notification record storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::postgres::PostgresPoolError;

use super::types::NotificationRecord;

/// Errors that can occur during notification store operations.
#[derive(Debug, Error)]
pub enum FeedStoreError {
    /// PostgreSQL operation failed
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A stored row could not be mapped back to a record
    #[error("Corrupt record {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },

    /// Backend is temporarily unavailable (e.g., circuit breaker open)
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown storage backend: {0}")]
    UnknownBackend(String),
}

impl From<PostgresPoolError> for FeedStoreError {
    fn from(err: PostgresPoolError) -> Self {
        match err {
            PostgresPoolError::Sqlx(e) => FeedStoreError::Postgres(e),
            other => FeedStoreError::Unavailable(other.to_string()),
        }
    }
}

/// Storage port for notification records.
///
/// Each mutation is a single atomic operation.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Backend identifier for health output
    fn backend_type(&self) -> &'static str;

    async fn insert(&self, record: NotificationRecord) -> Result<(), FeedStoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<NotificationRecord>, FeedStoreError>;

    /// Every record of a user, newest first
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<NotificationRecord>, FeedStoreError>;

    /// Every record written for one event, in channel order
    async fn list_for_event(&self, event_id: Uuid) -> Result<Vec<NotificationRecord>, FeedStoreError>;

    /// Set the read flag. `Ok(false)` when the record does not exist; marking
    /// an already read record succeeds without changing `read_at`.
    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, FeedStoreError>;

    /// Mark every visible unread record of a user read in one step; returns
    /// how many flipped
    async fn mark_all_read(&self, user_id: &str, at: DateTime<Utc>) -> Result<usize, FeedStoreError>;

    /// `Ok(false)` when the record does not exist
    async fn delete(&self, id: Uuid) -> Result<bool, FeedStoreError>;
}
