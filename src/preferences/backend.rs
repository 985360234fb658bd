//! Backend trait for routing settings storage.
//!
//! The dispatcher only reads through this port; administrative updates go
//! through the same trait so memory and PostgreSQL implementations can be
//! swapped by configuration.

use async_trait::async_trait;
use thiserror::Error;

use crate::notification::{Channel, Priority};
use crate::postgres::PostgresPoolError;

use super::types::{NotificationSettings, QuietHours};

/// Errors that can occur during settings backend operations.
#[derive(Debug, Error)]
pub enum SettingsStoreError {
    /// PostgreSQL operation failed
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Stored JSON could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend is temporarily unavailable (e.g., circuit breaker open)
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Unknown storage backend: {0}")]
    UnknownBackend(String),
}

impl From<PostgresPoolError> for SettingsStoreError {
    fn from(err: PostgresPoolError) -> Self {
        match err {
            PostgresPoolError::Sqlx(e) => SettingsStoreError::Postgres(e),
            other => SettingsStoreError::Unavailable(other.to_string()),
        }
    }
}

/// Storage port for per event type routing settings.
///
/// Every mutation touches exactly one event type's aggregate and must be
/// atomic for that aggregate.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Backend identifier for health output
    fn backend_type(&self) -> &'static str;

    /// Stored settings, or the defaults when the event type was never configured.
    async fn get_settings(&self, event_type: &str) -> Result<NotificationSettings, SettingsStoreError>;

    /// Upsert one channel entry and return the full aggregate.
    async fn update_channel_setting(
        &self,
        event_type: &str,
        channel: Channel,
        enabled: bool,
        threshold: Priority,
    ) -> Result<NotificationSettings, SettingsStoreError>;

    /// Upsert the quiet hours window and return the full aggregate.
    async fn update_quiet_hours(
        &self,
        event_type: &str,
        quiet_hours: QuietHours,
    ) -> Result<NotificationSettings, SettingsStoreError>;

    /// All explicitly configured event types, sorted by event type.
    async fn list_settings(&self) -> Result<Vec<NotificationSettings>, SettingsStoreError>;
}
